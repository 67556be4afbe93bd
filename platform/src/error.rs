//! Conversion from `kube` errors

use podbench_core::PlatformError;

/// Map a `kube` error onto the platform-neutral error
pub(crate) fn platform_error(err: kube::Error) -> PlatformError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => PlatformError::NotFound(resp.message),
        kube::Error::Api(resp) => PlatformError::Api {
            code: resp.code,
            message: resp.message,
        },
        other => PlatformError::Transport(other.to_string()),
    }
}
