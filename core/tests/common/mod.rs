//! Shared scenario setup: a live mock CMS on a random port backed by a temp
//! SQLite file that the harness's `Store` reads independently.

#![allow(dead_code)]

use cms_contract::{
    build_spec, encode_basic, ApiClient, Consistency, Credentials, Expect, HarnessConfig, Post,
    PostBody, PostStatus, RequestSpec, Store, UreqTransport,
};
use tempfile::TempDir;

pub struct Harness {
    _dir: TempDir,
    pub config: HarnessConfig,
    pub api: ApiClient<UreqTransport>,
    pub store: Store,
    pub admin: RequestSpec,
    pub author: RequestSpec,
    pub anonymous: RequestSpec,
}

/// Starts the mock CMS and wires a harness against it.
pub fn start() -> Harness {
    cms_contract::init_logging("debug");

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cms.db");
    let db = mock_cms::open_db(&db_path).unwrap();

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_cms::run(listener, db).await
        })
        .unwrap();
    });

    let config = HarnessConfig::new(&format!("http://{addr}"), &db_path).with_token(encode_basic(
        mock_cms::ADMIN_LOGIN,
        mock_cms::ADMIN_PASSWORD,
    ));
    let author = Credentials::Basic(encode_basic(
        mock_cms::AUTHOR_LOGIN,
        mock_cms::AUTHOR_PASSWORD,
    ));

    Harness {
        api: ApiClient::new(UreqTransport::new(), &config),
        store: Store::new(&config.store_path),
        admin: build_spec(&config.base_url, config.credentials().as_ref()),
        author: build_spec(&config.base_url, Some(&author)),
        anonymous: build_spec(&config.base_url, None),
        config,
        _dir: dir,
    }
}

impl Harness {
    pub fn check(&self) -> Consistency<'_> {
        Consistency::new(&self.store)
    }

    /// Creates a post as admin, requiring success.
    pub fn create(&self, title: &str, content: &str, status: PostStatus) -> Post {
        self.api
            .create_post(&self.admin, &PostBody::new(title, content, status), Expect::Success)
            .unwrap()
            .into_entity()
            .unwrap()
    }
}
