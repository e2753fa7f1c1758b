use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use capsule_core::CapsuleError;
use capsule_types::api::{
    AuthResponse, CapsuleResponse, CreateCapsuleRequest, LoginRequest, OpenCapsuleResponse,
    PublicPage, RegisterRequest,
};

/// The capsule operations the client needs from the server.
#[allow(async_fn_in_trait)]
pub trait CapsuleStore {
    /// Everyone else's capsules; the server excludes the viewer's own.
    async fn list_public(&self, page: u32, page_size: u32) -> Result<PublicPage, CapsuleError>;
    async fn list_owned(&self) -> Result<Vec<CapsuleResponse>, CapsuleError>;
    async fn create(&self, req: &CreateCapsuleRequest) -> Result<CapsuleResponse, CapsuleError>;
    async fn open(&self, id: Uuid) -> Result<OpenCapsuleResponse, CapsuleError>;
    async fn delete(&self, id: Uuid) -> Result<(), CapsuleError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpStore {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, CapsuleError> {
        let req = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.http.post(self.url("/auth/register")).json(&req)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, CapsuleError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.http.post(self.url("/auth/login")).json(&req)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, CapsuleError> {
        let res = self.authed(req).send().await.map_err(CapsuleError::backend)?;
        debug!("{} {}", res.status(), res.url());
        if res.status().is_success() {
            return Ok(res);
        }
        Err(error_from_response(res).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, CapsuleError> {
        self.send(req).await?.json().await.map_err(CapsuleError::backend)
    }
}

async fn error_from_response(res: Response) -> CapsuleError {
    let status = res.status();
    let message = res
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .unwrap_or_else(|_| status.to_string());
    error_for_status(status, message)
}

fn error_for_status(status: StatusCode, message: String) -> CapsuleError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => CapsuleError::Validation(message),
        StatusCode::UNAUTHORIZED => CapsuleError::Unauthenticated,
        StatusCode::FORBIDDEN => CapsuleError::Forbidden(message),
        StatusCode::CONFLICT => CapsuleError::Conflict(message),
        StatusCode::NOT_FOUND => CapsuleError::NotFound,
        _ => CapsuleError::Backend(message),
    }
}

impl CapsuleStore for HttpStore {
    async fn list_public(&self, page: u32, page_size: u32) -> Result<PublicPage, CapsuleError> {
        let req = self
            .http
            .get(self.url("/capsules/public"))
            .query(&[("page", page), ("page_size", page_size)]);
        self.send_json(req).await
    }

    async fn list_owned(&self) -> Result<Vec<CapsuleResponse>, CapsuleError> {
        self.send_json(self.http.get(self.url("/capsules/mine"))).await
    }

    async fn create(&self, req: &CreateCapsuleRequest) -> Result<CapsuleResponse, CapsuleError> {
        self.send_json(self.http.post(self.url("/capsules")).json(req)).await
    }

    async fn open(&self, id: Uuid) -> Result<OpenCapsuleResponse, CapsuleError> {
        self.send_json(self.http.post(self.url(&format!("/capsules/{}/open", id)))).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), CapsuleError> {
        self.send(self.http.delete(self.url(&format!("/capsules/{}", id)))).await?;
        Ok(())
    }
}
