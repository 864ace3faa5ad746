use ort::execution_providers::ExecutionProviderDispatch;

/// Hardware-accelerated ONNX Runtime providers for this platform.
///
/// Registration failures fall back to the CPU provider, so an empty or
/// unavailable list is never fatal.
pub fn platform_execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Name of the provider requested by [`platform_execution_providers`].
pub fn platform_provider_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "CoreML"
    } else if cfg!(target_os = "windows") {
        "DirectML"
    } else {
        "CPU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_list_matches_name() {
        let providers = platform_execution_providers();
        if platform_provider_name() == "CPU" {
            assert!(providers.is_empty());
        } else {
            assert_eq!(providers.len(), 1);
        }
    }
}
