use std::future::Future;
use std::pin::Pin;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteRequest {
    pub endpoint: String,
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RemoteVerdict {
    Accepted,
    Rejected(Option<String>),
    Failed(String),
}

pub type BoxedRemoteFuture<'a> = Pin<Box<dyn Future<Output = RemoteVerdict> + Send + 'a>>;

pub trait RemoteTransport: Send + Sync + 'static {
    fn check<'a>(&'a self, request: &'a RemoteRequest) -> BoxedRemoteFuture<'a>;
}

impl<F> RemoteTransport for F
where
    F: for<'a> Fn(&'a RemoteRequest) -> BoxedRemoteFuture<'a> + Send + Sync + 'static,
{
    fn check<'a>(&'a self, request: &'a RemoteRequest) -> BoxedRemoteFuture<'a> {
        (self)(request)
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use super::{BoxedRemoteFuture, RemoteRequest, RemoteTransport, RemoteVerdict};

    #[derive(Clone, Debug, Default)]
    pub struct HttpTransport {
        client: reqwest::Client,
    }

    impl HttpTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl RemoteTransport for HttpTransport {
        fn check<'a>(&'a self, request: &'a RemoteRequest) -> BoxedRemoteFuture<'a> {
            Box::pin(async move {
                let response = match self
                    .client
                    .get(&request.endpoint)
                    .query(&[(request.name.as_str(), request.value.as_str())])
                    .send()
                    .await
                {
                    Ok(response) => response,
                    Err(error) => return RemoteVerdict::Failed(error.to_string()),
                };

                let status = response.status();
                if status.is_success() {
                    RemoteVerdict::Accepted
                } else {
                    RemoteVerdict::Rejected(status.canonical_reason().map(str::to_string))
                }
            })
        }
    }
}
