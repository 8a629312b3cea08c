//! Port implementation for the static CAZI plugin.

use async_trait::async_trait;
use cazi_sdk::{
    AuthorizationPort, CallContext, CaziError, CheckRequest, CheckResponse, ListObjectsRequest,
    ListObjectsResponse,
};

use super::service::Service;

fn log_and_return<T>(op: &str, result: Result<T, CaziError>) -> Result<T, CaziError> {
    if let Err(e) = &result {
        if e.is_request_shape() {
            tracing::debug!(operation = op, error = %e, "static policy rejected request");
        } else {
            tracing::warn!(operation = op, error = %e, "static policy call interrupted");
        }
    }
    result
}

#[async_trait]
impl AuthorizationPort for Service {
    async fn check(
        &self,
        ctx: &CallContext,
        request: CheckRequest,
    ) -> Result<CheckResponse, CaziError> {
        let result = ctx
            .check()
            .map_err(CaziError::from)
            .and_then(|()| Service::check(self, &request));
        log_and_return("check", result)
    }

    async fn list_objects(
        &self,
        ctx: &CallContext,
        request: ListObjectsRequest,
    ) -> Result<ListObjectsResponse, CaziError> {
        let result = ctx
            .check()
            .map_err(CaziError::from)
            .and_then(|()| Service::list_objects(self, &request));
        log_and_return("list_objects", result)
    }
}
