//! The configured server endpoint and URL joining.

/// Host, port and base path of the record store. Built once from
/// configuration and immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Endpoint {
    host: String,
    port: u16,
    base_path: String,
}

impl Endpoint {
    pub fn new(host: &str, port: u16, base_path: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            base_path: base_path.to_string(),
        }
    }

    /// Join `path` onto the endpoint, inserting exactly one `/` at every
    /// seam no matter how either side spells its slashes. A trailing slash
    /// on `path` is preserved (the collection routes end in one).
    pub fn url_for(&self, path: &str) -> String {
        let mut url = format!("http://{}:{}", self.host, self.port);
        push_segment(&mut url, &self.base_path);
        push_segment(&mut url, path);
        url
    }
}

fn push_segment(url: &mut String, segment: &str) {
    let segment = segment.trim_start_matches('/');
    if segment.is_empty() {
        return;
    }
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str(segment);
}
