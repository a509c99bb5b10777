use futures_lite::io;
use std::{fs::Metadata, path::Path};
use trillium::{Conn, Headers, KnownHeaderName, Status};
use trillium_static_files::{
    crate_relative_path, static_files, BodyStream, ContentMeta, FileResponder, Filesystem,
    StaticConfig, StaticConnExt, StaticFileHandler,
};
use trillium_testing::prelude::*;

const A_TXT: &str = "The quick brown fox jumps over a lazy dog\n";

fn handler() -> StaticFileHandler {
    static_files(crate_relative_path!("tests/files")).unwrap()
}

#[test]
fn serves_files_with_caching_headers() {
    let conn = get("/a.txt").on(&handler());
    assert_ok!(
        conn,
        A_TXT,
        "content-type" => "text/plain; charset=utf-8",
        "content-length" => "42"
    );

    let conn = get("/a.txt").on(&handler());
    let etag = conn.response_headers().get_str(KnownHeaderName::Etag).unwrap();
    assert!(etag.len() > 2 && etag.starts_with('"') && etag.ends_with('"'));
    assert!(!etag[1..etag.len() - 1].contains('"'));

    assert_ok!(
        get("/index.html").on(&handler()),
        "<h1>hello world</h1>",
        "content-type" => "text/html; charset=utf-8"
    );
}

#[test]
fn second_request_with_etag_is_not_modified() {
    let handler = handler();
    let conn = get("/a.txt").on(&handler);
    let etag = conn
        .response_headers()
        .get_str(KnownHeaderName::Etag)
        .unwrap()
        .to_owned();

    let mut conn = get("/a.txt")
        .with_request_header("if-none-match", etag)
        .on(&handler);
    assert_eq!(conn.status(), Some(Status::NotModified));
    assert!(conn.take_response_body().is_none());

    assert_ok!(
        get("/a.txt")
            .with_request_header("if-none-match", "\"stale\"")
            .on(&handler),
        A_TXT
    );
}

#[test]
fn failures_have_plain_text_bodies() {
    let handler = handler();

    assert_response!(
        get("/docs").on(&handler),
        403,
        "Permission Denied",
        "content-type" => "text/plain"
    );

    assert_response!(
        get("/").on(&handler),
        403,
        "Permission Denied",
        "content-type" => "text/plain"
    );

    assert_response!(
        get("/missing.txt").on(&handler),
        404,
        "File Not Found",
        "content-type" => "text/plain"
    );
}

#[test]
fn traversal_stays_inside_the_root() {
    let handler = handler();
    assert_response!(get("/../../etc/passwd").on(&handler), 404, "File Not Found");
    assert_response!(
        get("/%2e%2e/%2e%2e/etc/passwd").on(&handler),
        404,
        "File Not Found"
    );
    assert_ok!(get("/docs/../../a.txt").on(&handler), A_TXT);
    assert_ok!(get("/docs/%2e%2e/a.txt").on(&handler), A_TXT);
}

#[test]
fn malformed_urls_are_rejected() {
    assert_response!(
        get("/a%zz.txt").on(&handler()),
        400,
        "Bad Request",
        "content-type" => "text/plain"
    );
    assert_response!(get("/a%ff.txt").on(&handler()), 400, "Bad Request");
}

#[test]
fn filter_decides_which_paths_are_handled() {
    let config = StaticConfig::new(crate_relative_path!("tests/files"))
        .unwrap()
        .with_filter("/docs/")
        .unwrap();
    let handler = StaticFileHandler::new(config);

    assert_not_handled!(get("/a.txt").on(&handler));
    assert_not_handled!(get("/public/docs/style.css").on(&handler));
    assert_ok!(
        get("/docs/style.css").on(&handler),
        "body { color: red; }\n",
        "content-type" => "text/css; charset=utf-8"
    );

    let config = StaticConfig::new(crate_relative_path!("tests/files"))
        .unwrap()
        .with_predicate(|path| path.ends_with(".html"));
    let handler = StaticFileHandler::new(config);
    assert_not_handled!(get("/a.txt").on(&handler));
    assert_ok!(get("/index.html").on(&handler), "<h1>hello world</h1>");
}

#[test]
fn resolve_reports_the_served_path() {
    let handler = handler();
    assert_eq!(
        handler.resolve("/../a.txt"),
        Some(crate_relative_path!("tests/files/a.txt"))
    );
    assert_eq!(handler.resolve("/a%zz"), None);
}

#[test]
fn conn_ext_send_path() {
    let app = |conn: Conn| async move {
        conn.send_path(crate_relative_path!("tests/files/index.html"))
            .await
    };
    assert_ok!(
        get("/anything").on(&app),
        "<h1>hello world</h1>",
        "content-type" => "text/html; charset=utf-8",
        "content-length" => "20"
    );

    let app = |conn: Conn| async move {
        conn.send_path(crate_relative_path!("tests/files/nope"))
            .await
    };
    assert_response!(get("/").on(&app), 404, "File Not Found");
}

#[test]
fn conn_ext_send_as_file() {
    let app = |conn: Conn| async move {
        let mut headers = Headers::new();
        headers.insert(KnownHeaderName::CacheControl, "no-cache");
        conn.send_as_file(
            "console.log('hi')",
            &ContentMeta::new().with_ext(".js"),
            headers,
        )
    };

    let conn = get("/app.js").on(&app);
    assert!(conn
        .response_headers()
        .get_str(KnownHeaderName::ContentType)
        .unwrap()
        .contains("javascript"));
    assert_ok!(
        conn,
        "console.log('hi')",
        "cache-control" => "no-cache",
        "content-length" => "17"
    );

    let app = |conn: Conn| async move {
        conn.send_as_file(
            "versioned",
            &ContentMeta::new().with_etag("v2"),
            Headers::new(),
        )
    };
    assert_ok!(get("/").on(&app), "versioned", "etag" => "\"v2\"");
}

#[test]
fn conn_ext_leaves_an_earlier_status_alone() {
    let app = |conn: Conn| async move {
        conn.with_status(Status::Unauthorized)
            .send_path(crate_relative_path!("tests/files/a.txt"))
            .await
    };

    let mut conn = get("/a.txt").on(&app);
    assert_eq!(conn.status(), Some(Status::Unauthorized));
    assert_eq!(conn.response_headers().get_str(KnownHeaderName::Etag), None);
    assert_eq!(
        conn.response_headers()
            .get_str(KnownHeaderName::ContentType),
        None
    );
    assert!(conn.take_response_body().is_none());
}

/// stats files normally but refuses to open them
struct Unreadable;

#[trillium::async_trait]
impl Filesystem for Unreadable {
    async fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        std::fs::metadata(path)
    }

    async fn open(&self, _path: &Path) -> io::Result<BodyStream> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "unreadable"))
    }
}

#[test]
fn open_failure_after_stat_is_a_clean_502() {
    let handler = handler().with_responder(FileResponder::new().with_filesystem(Unreadable));

    let conn = get("/a.txt").on(&handler);
    assert_eq!(conn.response_headers().get_str(KnownHeaderName::Etag), None);
    assert_ne!(
        conn.response_headers()
            .get_str(KnownHeaderName::ContentLength),
        Some("42")
    );
    assert_response!(
        conn,
        502,
        "Internal Server Error",
        "content-type" => "text/plain"
    );
}

#[test]
fn conn_ext_send_path_with_etag() {
    let app = |conn: Conn| async move {
        conn.send_path_with_etag(crate_relative_path!("tests/files/a.txt"), "build-7")
            .await
    };

    assert_ok!(get("/").on(&app), A_TXT, "etag" => "\"build-7\"");

    let mut conn = get("/")
        .with_request_header("if-none-match", "\"build-7\"")
        .on(&app);
    assert_eq!(conn.status(), Some(Status::NotModified));
    assert!(conn.take_response_body().is_none());
}

#[test]
fn configured_headers_mark_handled_responses() {
    let mut headers = Headers::new();
    headers.insert("x-served-by", "static-files");
    let config = StaticConfig::new(crate_relative_path!("tests/files"))
        .unwrap()
        .with_filter("/docs")
        .unwrap();
    let handler = StaticFileHandler::new(config).with_headers(headers);

    assert_ok!(
        get("/docs/style.css").on(&handler),
        "body { color: red; }\n",
        "x-served-by" => "static-files"
    );

    assert_response!(
        get("/docs/missing.css").on(&handler),
        404,
        "File Not Found",
        "x-served-by" => "static-files"
    );

    let conn = get("/a.txt").on(&handler);
    assert_eq!(conn.response_headers().get_str("x-served-by"), None);
    assert_not_handled!(conn);
}
