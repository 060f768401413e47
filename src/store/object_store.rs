use std::{path::PathBuf, sync::Arc, time::Duration};

use object_store::{
    aws::AmazonS3Builder, buffered::BufWriter, local::LocalFileSystem, path::Path, Attribute,
    Attributes, ClientOptions,
};
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use url::Url;

use crate::{
    asset_key::AssetKey,
    config::{Filesystem, ObjectStorage},
    error_code::ErrorCode,
    future::WithMetrics,
    store::{Store, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum ObjectError {
    #[error("Failed to configure object store")]
    Build(#[source] object_store::Error),

    #[error("Failed to create storage directory")]
    CreateDir(#[source] std::io::Error),

    #[error("Storage directory {0:?} cannot be expressed as a URL")]
    DirectoryUrl(PathBuf),

    #[error("Invalid public URL base")]
    PublicUrl(#[source] url::ParseError),

    #[error("Invalid object key")]
    Key(#[from] object_store::path::Error),

    #[error("Error making request")]
    Request(#[source] object_store::Error),

    #[error("Error writing object")]
    Io(#[source] std::io::Error),
}

impl ObjectError {
    pub(super) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Build(_) | Self::CreateDir(_) | Self::DirectoryUrl(_) => {
                ErrorCode::OBJECT_STORE_CONFIG
            }
            Self::PublicUrl(_) | Self::Key(_) => ErrorCode::INVALID_OBJECT_KEY,
            Self::Request(_) => ErrorCode::OBJECT_REQUEST_ERROR,
            Self::Io(_) => ErrorCode::OBJECT_IO_ERROR,
        }
    }
}

#[derive(Clone)]
pub(crate) struct ObjectStore {
    inner: Arc<dyn object_store::ObjectStore>,
    public_base: Url,
    content_types: bool,
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("inner", &self.inner.to_string())
            .field("public_base", &self.public_base.as_str())
            .finish()
    }
}

impl ObjectStore {
    #[tracing::instrument(skip_all)]
    pub(crate) fn build(storage: ObjectStorage) -> Result<Self, StoreError> {
        let (builder, public_base) = s3_builder(storage)?;

        Self::from_s3(builder, public_base)
    }

    fn from_s3(builder: AmazonS3Builder, public_base: Url) -> Result<Self, StoreError> {
        let inner = builder.build().map_err(ObjectError::Build)?;

        Ok(ObjectStore {
            inner: Arc::new(inner),
            public_base: directory(public_base),
            content_types: true,
        })
    }

    #[tracing::instrument(skip_all)]
    pub(crate) async fn build_filesystem(
        Filesystem {
            path,
            public_endpoint,
        }: Filesystem,
    ) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(ObjectError::CreateDir)?;
        let path = tokio::fs::canonicalize(&path)
            .await
            .map_err(ObjectError::CreateDir)?;

        let inner = LocalFileSystem::new_with_prefix(&path).map_err(ObjectError::Build)?;

        let public_base = match public_endpoint {
            Some(public_endpoint) => public_endpoint,
            None => Url::from_directory_path(&path)
                .map_err(|()| ObjectError::DirectoryUrl(path.clone()))?,
        };

        Ok(ObjectStore {
            inner: Arc::new(inner),
            public_base: directory(public_base),
            // local files have nowhere to record a media type
            content_types: false,
        })
    }

    #[cfg(test)]
    pub(crate) fn in_memory(public_base: Url) -> (Self, Arc<object_store::memory::InMemory>) {
        let memory = Arc::new(object_store::memory::InMemory::new());

        let store = ObjectStore {
            inner: memory.clone(),
            public_base: directory(public_base),
            content_types: true,
        };

        (store, memory)
    }
}

/// Configure an S3 client along with the base URL its objects are served from
///
/// With virtual-hosted requests and a custom endpoint the client is pointed at the
/// bucket-qualified host, so uploads land exactly where the public URL says they are.
fn s3_builder(
    ObjectStorage {
        endpoint,
        bucket_name,
        use_path_style,
        region,
        access_key,
        secret_key,
        session_token,
        client_timeout,
        public_endpoint,
    }: ObjectStorage,
) -> Result<(AmazonS3Builder, Url), ObjectError> {
    let bucket_base = bucket_url(endpoint.as_ref(), &bucket_name, &region, use_path_style)?;

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(&bucket_name)
        .with_region(&region)
        .with_virtual_hosted_style_request(!use_path_style)
        .with_client_options(
            ClientOptions::new().with_timeout(Duration::from_secs(client_timeout.unwrap_or(30))),
        );

    if let Some(endpoint) = &endpoint {
        let request_endpoint = if use_path_style {
            endpoint
        } else {
            &bucket_base
        };

        builder = builder
            .with_endpoint(request_endpoint.as_str().trim_end_matches('/'))
            .with_allow_http(endpoint.scheme() == "http");
    }

    if let Some(access_key) = access_key {
        builder = builder.with_access_key_id(access_key);
    }
    if let Some(secret_key) = secret_key {
        builder = builder.with_secret_access_key(secret_key);
    }
    if let Some(session_token) = session_token {
        builder = builder.with_token(session_token);
    }

    Ok((builder, public_endpoint.unwrap_or(bucket_base)))
}

/// Where a bucket's objects are served from when no public endpoint is configured
fn bucket_url(
    endpoint: Option<&Url>,
    bucket_name: &str,
    region: &str,
    use_path_style: bool,
) -> Result<Url, ObjectError> {
    let url = match (endpoint, use_path_style) {
        (Some(endpoint), true) => directory(endpoint.clone())
            .join(&format!("{bucket_name}/"))
            .map_err(ObjectError::PublicUrl)?,
        (Some(endpoint), false) => {
            let mut url = endpoint.clone();
            let host = endpoint.host_str().unwrap_or_default();
            url.set_host(Some(&format!("{bucket_name}.{host}")))
                .map_err(ObjectError::PublicUrl)?;
            url
        }
        (None, true) => format!("https://s3.{region}.amazonaws.com/{bucket_name}/")
            .parse()
            .map_err(ObjectError::PublicUrl)?,
        (None, false) => format!("https://{bucket_name}.s3.{region}.amazonaws.com/")
            .parse()
            .map_err(ObjectError::PublicUrl)?,
    };

    Ok(url)
}

// Url::join replaces the final segment unless the base ends with a slash
fn directory(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url
}

// failures reading the source are the caller's, failures writing belong to the store
async fn copy_into<Reader, Writer>(reader: Reader, writer: &mut Writer) -> Result<(), StoreError>
where
    Reader: AsyncRead + Unpin,
    Writer: AsyncWrite + Unpin,
{
    let mut stream = ReaderStream::new(reader);

    while let Some(res) = stream.next().await {
        let mut bytes = res.map_err(StoreError::Read)?;

        writer
            .write_all_buf(&mut bytes)
            .await
            .map_err(ObjectError::Io)?;
    }

    writer.shutdown().await.map_err(ObjectError::Io)?;

    Ok(())
}

#[async_trait::async_trait]
impl Store for ObjectStore {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner
            .list_with_delimiter(None)
            .with_metrics(crate::init_metrics::OBJECT_STORAGE_HEALTH)
            .await
            .map_err(ObjectError::Request)?;

        Ok(())
    }

    #[tracing::instrument(skip(self, reader))]
    async fn save_async_read<Reader>(
        &self,
        key: &AssetKey,
        reader: Reader,
        content_type: &mime::Mime,
    ) -> Result<(), StoreError>
    where
        Reader: AsyncRead + Unpin + Send,
    {
        let path = Path::parse(key.as_str()).map_err(ObjectError::from)?;

        let mut writer = BufWriter::new(Arc::clone(&self.inner), path);

        if self.content_types {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            writer = writer.with_attributes(attributes);
        }

        let res = copy_into(reader, &mut writer)
            .with_metrics(crate::init_metrics::OBJECT_STORAGE_PUT)
            .await;

        if let Err(e) = res {
            if let Err(abort) = writer.abort().await {
                tracing::warn!("Failed to abort upload of {key}: {abort}");
            }

            return Err(e);
        }

        Ok(())
    }

    fn public_url(&self, key: &AssetKey) -> Result<Url, StoreError> {
        Ok(self
            .public_base
            .join(key.as_str())
            .map_err(ObjectError::PublicUrl)?)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::stream;
    use object_store::{path::Path, ObjectStore as _};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use tokio_util::io::StreamReader;

    use super::{s3_builder, ObjectStore};
    use crate::{
        asset_key::{AssetKey, NameSource},
        config::ObjectStorage,
        formats::VideoFormat,
        orientation::Orientation,
        store::{Store, StoreError},
    };

    struct Fixed;

    impl NameSource for Fixed {
        fn next_name(&self) -> String {
            String::from("abc")
        }
    }

    fn key() -> AssetKey {
        AssetKey::generate(VideoFormat::Mp4, Orientation::Landscape, &Fixed)
    }

    fn storage() -> ObjectStorage {
        ObjectStorage {
            endpoint: None,
            bucket_name: String::from("tubely"),
            use_path_style: false,
            region: String::from("us-east-2"),
            access_key: Some(String::from("access")),
            secret_key: Some(String::from("secret")),
            session_token: None,
            client_timeout: None,
            public_endpoint: None,
        }
    }

    struct Captured {
        target: String,
        host: String,
    }

    // answers a single PUT sent through the listener as an http proxy
    async fn capture_put(listener: TcpListener) -> Captured {
        let (mut socket, _) = listener.accept().await.expect("Accepted connection");

        let mut buf = Vec::new();
        let head_end = loop {
            let mut chunk = [0u8; 4096];
            let n = socket.read(&mut chunk).await.expect("Read request");
            assert!(n > 0, "connection closed before headers finished");
            buf.extend_from_slice(&chunk[..n]);

            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let header = |wanted: &str| {
            head.lines().skip(1).find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case(wanted)
                    .then(|| value.trim().to_string())
            })
        };

        let content_length = header("content-length")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < head_end + content_length {
            let mut chunk = [0u8; 4096];
            let n = socket.read(&mut chunk).await.expect("Read body");
            assert!(n > 0, "connection closed before body finished");
            buf.extend_from_slice(&chunk[..n]);
        }

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nETag: \"abc\"\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            )
            .await
            .expect("Wrote response");

        let mut request_line = head.lines().next().unwrap_or_default().split(' ');
        assert_eq!(request_line.next(), Some("PUT"));

        Captured {
            target: request_line.next().unwrap_or_default().to_string(),
            host: header("host").unwrap_or_default(),
        }
    }

    async fn put_through_proxy(storage: ObjectStorage) -> (Captured, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Bound listener");
        let proxy = format!("http://{}", listener.local_addr().expect("Local addr"));

        let (builder, public_base) = s3_builder(storage).expect("Configured client");
        let store = ObjectStore::from_s3(builder.with_proxy_url(proxy), public_base)
            .expect("Built store");

        let captured = tokio::spawn(capture_put(listener));

        store
            .save_async_read(&key(), &b"bytes"[..], &VideoFormat::Mp4.media_type())
            .await
            .expect("Saved");

        let public_url = store.public_url(&key()).expect("Valid url");

        (captured.await.expect("Capture finished"), public_url.to_string())
    }

    #[tokio::test]
    async fn virtual_host_uploads_where_public_url_points() {
        let (captured, public_url) = put_through_proxy(ObjectStorage {
            endpoint: Some("http://localhost:9000".parse().expect("Valid url")),
            ..storage()
        })
        .await;

        assert_eq!(public_url, "http://tubely.localhost:9000/landscape/abc.mp4");
        assert_eq!(captured.host, "tubely.localhost:9000");
        assert!(
            captured.target == "/landscape/abc.mp4" || captured.target == public_url,
            "{}",
            captured.target
        );
    }

    #[tokio::test]
    async fn path_style_uploads_where_public_url_points() {
        let (captured, public_url) = put_through_proxy(ObjectStorage {
            endpoint: Some("http://localhost:9000".parse().expect("Valid url")),
            use_path_style: true,
            ..storage()
        })
        .await;

        assert_eq!(public_url, "http://localhost:9000/tubely/landscape/abc.mp4");
        assert_eq!(captured.host, "localhost:9000");
        assert!(
            captured.target == "/tubely/landscape/abc.mp4" || captured.target == public_url,
            "{}",
            captured.target
        );
    }

    #[tokio::test]
    async fn unreadable_source_is_a_read_error() {
        let (store, memory) =
            ObjectStore::in_memory("https://cdn.example.com".parse().expect("Valid url"));

        let reader = StreamReader::new(stream::iter(vec![
            Ok(Bytes::from_static(b"moov")),
            Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "file truncated",
            )),
        ]));

        let error = store
            .save_async_read(&key(), reader, &VideoFormat::Mp4.media_type())
            .await
            .expect_err("Source failed");

        assert!(matches!(error, StoreError::Read(_)));
        assert_eq!(error.error_code().as_str(), "io-error");
        assert!(memory
            .get(&Path::from("landscape/abc.mp4"))
            .await
            .is_err());
    }

    #[test]
    fn virtual_host_url() {
        let store = ObjectStore::build(storage()).expect("Built store");

        assert_eq!(
            store.public_url(&key()).expect("Valid url").as_str(),
            "https://tubely.s3.us-east-2.amazonaws.com/landscape/abc.mp4"
        );
    }

    #[test]
    fn path_style_url() {
        let store = ObjectStore::build(ObjectStorage {
            endpoint: Some("http://localhost:9000".parse().expect("Valid url")),
            use_path_style: true,
            ..storage()
        })
        .expect("Built store");

        assert_eq!(
            store.public_url(&key()).expect("Valid url").as_str(),
            "http://localhost:9000/tubely/landscape/abc.mp4"
        );
    }

    #[test]
    fn public_endpoint_url() {
        let store = ObjectStore::build(ObjectStorage {
            public_endpoint: Some("https://cdn.example.com/videos".parse().expect("Valid url")),
            ..storage()
        })
        .expect("Built store");

        assert_eq!(
            store.public_url(&key()).expect("Valid url").as_str(),
            "https://cdn.example.com/videos/landscape/abc.mp4"
        );
    }

    #[tokio::test]
    async fn saves_with_content_type() {
        let (store, memory) =
            ObjectStore::in_memory("https://cdn.example.com".parse().expect("Valid url"));

        store
            .save_async_read(
                &key(),
                &b"faststart bytes"[..],
                &VideoFormat::Mp4.media_type(),
            )
            .await
            .expect("Saved");

        let object = memory
            .get(&Path::from("landscape/abc.mp4"))
            .await
            .expect("Object exists");

        assert_eq!(
            object
                .attributes
                .get(&object_store::Attribute::ContentType)
                .map(|value| value.as_ref()),
            Some("video/mp4")
        );
        assert_eq!(
            object.bytes().await.expect("Read object").as_ref(),
            b"faststart bytes"
        );
    }

    #[tokio::test]
    async fn filesystem_store_writes_files() {
        let root = std::env::temp_dir()
            .join("tubely-tests")
            .join(uuid::Uuid::now_v7().to_string());

        let store = ObjectStore::build_filesystem(crate::config::Filesystem {
            path: root.clone(),
            public_endpoint: None,
        })
        .await
        .expect("Built store");

        store.health_check().await.expect("Healthy");

        store
            .save_async_read(&key(), &b"bytes"[..], &VideoFormat::Mp4.media_type())
            .await
            .expect("Saved");

        let url = store.public_url(&key()).expect("Valid url");
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("/landscape/abc.mp4"));

        let on_disk = tokio::fs::read(root.join("landscape/abc.mp4"))
            .await
            .expect("File exists");
        assert_eq!(on_disk, b"bytes");

        tokio::fs::remove_dir_all(root).await.expect("Removed");
    }
}
