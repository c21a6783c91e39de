//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tiny_http::{Header, Response, Server};

/// Canned reply for one request path
#[derive(Clone)]
pub enum Reply {
    /// 200 with a binary body
    Bytes(Vec<u8>),
    /// 200 with an HTML body
    Html(String),
    /// Error status with a short body
    Status(u16),
}

/// A tiny_http server running on its own thread
pub struct TestServer {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Serve `routes` on an ephemeral local port; unknown paths get 404
    pub fn start(routes: Vec<(&str, Reply)>) -> Self {
        let routes = routes
            .into_iter()
            .map(|(path, reply)| (path.to_string(), reply))
            .collect::<HashMap<_, _>>();

        let server = Server::http("127.0.0.1:0").expect("bind test server");
        let addr = server.server_addr().to_ip().expect("tcp listen address");
        let hits = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&hits);

        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let path = request.url().to_string();
                recorded.lock().unwrap().push(path.clone());

                let response = match routes.get(&path) {
                    Some(Reply::Bytes(body)) => Response::from_data(body.clone()).with_header(
                        "Content-Type: image/jpeg".parse::<Header>().unwrap(),
                    ),
                    Some(Reply::Html(body)) => Response::from_string(body.clone()).with_header(
                        "Content-Type: text/html; charset=utf-8"
                            .parse::<Header>()
                            .unwrap(),
                    ),
                    Some(Reply::Status(code)) => {
                        Response::from_string("error").with_status_code(*code)
                    }
                    None => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// How many times `path` was requested
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().iter().filter(|p| *p == path).count()
    }
}

/// Listing markup in the layout the default selectors expect
pub fn listing_html(title: &str, price: Option<&str>, images: &[(&str, Option<&str>)]) -> String {
    let price = price
        .map(|p| format!(r#"<div class="x-price-primary"><span class="ux-textspans">{p}</span></div>"#))
        .unwrap_or_default();

    let images = images
        .iter()
        .map(|(src, zoom)| match zoom {
            Some(zoom) => format!(
                r#"<div class="ux-image-carousel-item"><img src="{src}" data-zoom-src="{zoom}"></div>"#
            ),
            None => format!(r#"<div class="ux-image-carousel-item"><img src="{src}"></div>"#),
        })
        .collect::<String>();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Listing</title></head>
<body>
<div class="vim x-item-title">
  <h1 class="x-item-title__mainTitle"><span class="ux-textspans ux-textspans--BOLD">{title}</span></h1>
</div>
{price}
{images}
</body>
</html>"#
    )
}
