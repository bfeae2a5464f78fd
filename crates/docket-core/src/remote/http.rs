use std::time::Duration;

use async_trait::async_trait;
use docket_shared::{
  ApiResponse,
  TaskPatch,
  TaskWire
};
use reqwest::{
  Client,
  RequestBuilder,
  Response,
  Url
};
use tracing::{
  debug,
  instrument,
  warn
};

use super::TaskRemote;
use crate::config::ApiSettings;
use crate::error::RemoteError;
use crate::task::TaskRecord;

/// REST client for the task resource
/// (`{base_url}/{resource}`).
#[derive(Debug, Clone)]
pub struct HttpRemote {
  client:     Client,
  collection: Url
}

impl HttpRemote {
  pub fn new(
    settings: &ApiSettings
  ) -> Result<Self, RemoteError> {
    let collection = collection_url(
      &settings.base_url,
      &settings.resource
    )?;

    let client = Client::builder()
      .timeout(Duration::from_secs(
        settings.timeout_secs
      ))
      .user_agent(concat!(
        "docket/",
        env!("CARGO_PKG_VERSION")
      ))
      .build()
      .map_err(|source| {
        RemoteError::Transport {
          method: "BUILD",
          url: collection.to_string(),
          source
        }
      })?;

    debug!(collection = %collection, "http remote ready");
    Ok(Self {
      client,
      collection
    })
  }

  fn item_url(
    &self,
    id: &str
  ) -> Result<Url, RemoteError> {
    let mut url =
      self.collection.clone();
    url
      .path_segments_mut()
      .map_err(|_| {
        RemoteError::InvalidUrl {
          url: self
            .collection
            .to_string()
        }
      })?
      .push(id);
    Ok(url)
  }

  async fn send(
    &self,
    method: &'static str,
    url: &Url,
    request: RequestBuilder
  ) -> Result<Response, RemoteError> {
    let response = request
      .send()
      .await
      .map_err(|source| {
        RemoteError::Transport {
          method,
          url: url.to_string(),
          source
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      warn!(
        method,
        url = %url,
        status = status.as_u16(),
        "remote store rejected request"
      );
      return Err(RemoteError::Status {
        method,
        url: url.to_string(),
        status: status.as_u16()
      });
    }
    Ok(response)
  }
}

#[async_trait]
impl TaskRemote for HttpRemote {
  #[instrument(skip(self), fields(url = %self.collection))]
  async fn fetch_all(
    &self
  ) -> Result<Vec<TaskRecord>, RemoteError>
  {
    let url = &self.collection;
    let response = self
      .send(
        "GET",
        url,
        self.client.get(url.clone())
      )
      .await?;

    let envelope: ApiResponse = response
      .json()
      .await
      .map_err(|err| {
        RemoteError::Decode {
          url:    url.to_string(),
          detail: err.to_string()
        }
      })?;

    debug!(
      code = envelope.code,
      count = envelope.data.len(),
      remark = %envelope.remark,
      "fetched task list"
    );
    Ok(
      envelope
        .data
        .into_iter()
        .map(TaskRecord::from_wire)
        .collect()
    )
  }

  #[instrument(skip(self, task), fields(url = %self.collection))]
  async fn create(
    &self,
    task: &TaskRecord
  ) -> Result<Option<TaskRecord>, RemoteError>
  {
    let url = &self.collection;
    let response = self
      .send(
        "POST",
        url,
        self
          .client
          .post(url.clone())
          .json(&task.to_create())
      )
      .await?;

    let body = match response.text().await
    {
      | Ok(body) => body,
      | Err(err) => {
        warn!(
          error = %err,
          "could not read create echo \
           body; keeping the draft as sent"
        );
        return Ok(None);
      }
    };
    match decode_echo(&body) {
      | Ok(echo) => {
        Ok(Some(TaskRecord::from_wire(echo)))
      }
      | Err(err) => {
        debug!(
          error = %err,
          "create echo not decodable; \
           keeping the draft as sent"
        );
        Ok(None)
      }
    }
  }

  #[instrument(skip(self, patch))]
  async fn update(
    &self,
    id: &str,
    patch: &TaskPatch
  ) -> Result<(), RemoteError> {
    let url = self.item_url(id)?;
    self
      .send(
        "PUT",
        &url,
        self.client.put(url.clone()).json(patch)
      )
      .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn delete(
    &self,
    id: &str
  ) -> Result<(), RemoteError> {
    let url = self.item_url(id)?;
    self
      .send(
        "DELETE",
        &url,
        self.client.delete(url.clone())
      )
      .await?;
    Ok(())
  }
}

/// The created record, either bare or
/// wrapped in the `{ code, data, remark }`
/// envelope.
fn decode_echo(
  body: &str
) -> serde_json::Result<TaskWire> {
  let mut value: serde_json::Value =
    serde_json::from_str(body)?;
  if let Some(inner) = value
    .get_mut("data")
    .filter(|data| data.is_object())
  {
    value = inner.take();
  }
  serde_json::from_value(value)
}

fn collection_url(
  base_url: &str,
  resource: &str
) -> Result<Url, RemoteError> {
  let invalid = || {
    RemoteError::InvalidUrl {
      url: format!(
        "{base_url} + {resource}"
      )
    }
  };

  let mut url = Url::parse(
    base_url.trim()
  )
  .map_err(|_| invalid())?;
  {
    let mut segments = url
      .path_segments_mut()
      .map_err(|_| invalid())?;
    segments.pop_if_empty();
    for part in resource
      .split('/')
      .filter(|part| !part.is_empty())
    {
      segments.push(part);
    }
  }
  Ok(url)
}

#[cfg(test)]
mod tests {
  use tokio::io::{
    AsyncReadExt,
    AsyncWriteExt
  };
  use tokio::net::TcpListener;

  use super::*;

  /// Answers one connection with `reply`
  /// verbatim, then hangs up.
  async fn serve_once(
    reply: &'static str
  ) -> String {
    let listener =
      TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr =
      listener.local_addr().expect("addr");
    tokio::spawn(async move {
      if let Ok((mut socket, _)) =
        listener.accept().await
      {
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
          .write_all(reply.as_bytes())
          .await;
        let _ = socket.shutdown().await;
      }
    });
    format!("http://{addr}")
  }

  fn settings(
    base_url: &str
  ) -> ApiSettings {
    ApiSettings {
      base_url:     base_url.to_string(),
      resource:     "products".to_string(),
      timeout_secs: 5
    }
  }

  #[test]
  fn collection_url_joins_resource() {
    let url = collection_url(
      "https://example.test/",
      "products"
    )
    .expect("url");
    assert_eq!(
      url.as_str(),
      "https://example.test/products"
    );

    let nested = collection_url(
      "https://example.test/api",
      "/v1/products/"
    )
    .expect("url");
    assert_eq!(
      nested.as_str(),
      "https://example.test/api/v1/products"
    );
  }

  #[test]
  fn create_echo_bare_or_enveloped() {
    let bare = decode_echo(
      r#"{"_id":"65f0","entity":"Acme","task":"Call","status":"Open"}"#
    )
    .expect("bare");
    assert_eq!(bare.identity(), Some("65f0"));

    let wrapped = decode_echo(
      r#"{"code":201,"data":{"_id":"65f1","entity":"Acme"},"remark":"created"}"#
    )
    .expect("envelope");
    assert_eq!(wrapped.identity(), Some("65f1"));
    assert_eq!(wrapped.entity, "Acme");

    assert!(decode_echo("").is_err());
  }

  #[test]
  fn item_url_escapes_ids() {
    let remote = HttpRemote::new(
      &settings("https://example.test")
    )
    .expect("client");
    let url =
      remote.item_url("a/b c").expect("url");
    assert_eq!(
      url.as_str(),
      "https://example.test/products/a%2Fb%20c"
    );
  }

  #[test]
  fn rejects_non_hierarchical_base() {
    assert!(matches!(
      collection_url(
        "mailto:ops@example.test",
        "products"
      ),
      Err(RemoteError::InvalidUrl { .. })
    ));
    assert!(
      HttpRemote::new(&settings(
        "not a url"
      ))
      .is_err()
    );
  }

  #[tokio::test]
  async fn non_success_status_is_reported()
  {
    let base = serve_once(
      "HTTP/1.1 500 Internal Server Error\r\n\
       Content-Length: 0\r\n\
       Connection: close\r\n\r\n"
    )
    .await;
    let remote =
      HttpRemote::new(&settings(&base))
        .expect("client");

    let err = remote
      .fetch_all()
      .await
      .expect_err("500 must fail");
    assert!(matches!(
      err,
      RemoteError::Status {
        method: "GET",
        status: 500,
        ..
      }
    ));
  }

  #[tokio::test]
  async fn refused_connection_is_transport()
  {
    let listener =
      TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr =
      listener.local_addr().expect("addr");
    drop(listener);

    let remote = HttpRemote::new(&settings(
      &format!("http://{addr}")
    ))
    .expect("client");
    let err = remote
      .delete("abc")
      .await
      .expect_err("nothing listens");
    assert!(matches!(
      err,
      RemoteError::Transport {
        method: "DELETE",
        ..
      }
    ));
  }

  #[tokio::test]
  async fn create_reads_echo_from_body() {
    let base = serve_once(
      "HTTP/1.1 201 Created\r\n\
       Content-Type: application/json\r\n\
       Content-Length: 41\r\n\
       Connection: close\r\n\r\n\
       {\"_id\":\"65f2\",\"task\":\"Call\",\"notes\":null}"
    )
    .await;
    let remote =
      HttpRemote::new(&settings(&base))
        .expect("client");

    let echo = remote
      .create(&TaskRecord::default())
      .await
      .expect("created")
      .expect("echo");
    assert_eq!(
      echo.id.as_ref().and_then(|id| id.as_store()),
      Some("65f2")
    );
    assert_eq!(echo.notes, "");
  }

  #[tokio::test]
  async fn truncated_create_echo_keeps_draft()
  {
    let base = serve_once(
      "HTTP/1.1 201 Created\r\n\
       Content-Type: application/json\r\n\
       Content-Length: 200\r\n\
       Connection: close\r\n\r\n\
       {\"_id\":\"65f3\""
    )
    .await;
    let remote =
      HttpRemote::new(&settings(&base))
        .expect("client");

    let echo = remote
      .create(&TaskRecord::default())
      .await
      .expect("a failed echo read is not a failed create");
    assert!(echo.is_none());
  }
}
