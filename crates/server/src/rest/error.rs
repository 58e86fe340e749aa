use axum::http::StatusCode;
use pulse_workers::store::StoreError;

pub fn store_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::AlreadyAcknowledged(_) => StatusCode::CONFLICT,
        StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        StoreError::Transient(e) => {
            tracing::warn!(error = %e, "store unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
        StoreError::Backend(e) => {
            tracing::error!(error = %e, "store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_store_errors() {
        assert_eq!(store_status(StoreError::NotFound("a".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            store_status(StoreError::AlreadyAcknowledged("a".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            store_status(StoreError::Transient("timeout".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
