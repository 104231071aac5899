use std::{fmt, str::FromStr};

use url::Url;

use crate::{RelayError, Result};

/// Backend path every descriptor is submitted to.
pub const REQUEST_PATH: &str = "/request";

/// HTTP method the backend is asked to use.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = RelayError;

    fn from_str(value: &str) -> Result<Self> {
        let method = match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "CONNECT" => Self::Connect,
            "TRACE" => Self::Trace,
            _ => {
                return Err(RelayError::InvalidField {
                    field: "method",
                    value: value.to_owned(),
                })
            }
        };
        Ok(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body encoding the backend applies to the outbound request.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Encoding {
    Ascii,
    #[default]
    Utf8,
    Utf16,
    Utf32,
    Latin1,
    Gbk,
    Gb18030,
    Big5,
    ShiftJis,
    EucJp,
    EucKr,
}

impl Encoding {
    pub const ALL: [Encoding; 11] = [
        Self::Ascii,
        Self::Utf8,
        Self::Utf16,
        Self::Utf32,
        Self::Latin1,
        Self::Gbk,
        Self::Gb18030,
        Self::Big5,
        Self::ShiftJis,
        Self::EucJp,
        Self::EucKr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Utf8 => "utf-8",
            Self::Utf16 => "utf-16",
            Self::Utf32 => "utf-32",
            Self::Latin1 => "latin-1",
            Self::Gbk => "gbk",
            Self::Gb18030 => "gb18030",
            Self::Big5 => "big5",
            Self::ShiftJis => "shift-jis",
            Self::EucJp => "euc-jp",
            Self::EucKr => "euc-kr",
        }
    }
}

impl FromStr for Encoding {
    type Err = RelayError;

    fn from_str(value: &str) -> Result<Self> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|encoding| encoding.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RelayError::InvalidField {
                field: "encoding",
                value: value.to_owned(),
            })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request for the backend to perform on the caller's behalf.
///
/// Free-form fields are sent exactly as given; nothing is validated before
/// transmission.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    pub encoding: Encoding,
    pub body: String,
    pub custom_headers: String,
    pub cookie: String,
    pub proxy: String,
}

impl RequestDescriptor {
    /// Creates a `GET` descriptor with `utf-8` encoding and empty extras.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn custom_headers(mut self, headers: impl Into<String>) -> Self {
        self.custom_headers = headers.into();
        self
    }

    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = proxy.into();
        self
    }

    /// Builds a descriptor from form fields keyed by their input names.
    ///
    /// Recognized names: `url`, `method`, `encoding`, `data`,
    /// `custom-headers`, `cookie`, `proxy`. Unknown names are ignored and a
    /// repeated name keeps its last value. Only `method` and `encoding` are
    /// checked, since they come from fixed option lists.
    pub fn from_form<I, K, V>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut descriptor = Self::default();
        for (name, value) in fields {
            let value = value.into();
            match name.as_ref() {
                "url" => descriptor.url = value,
                "method" => descriptor.method = value.parse()?,
                "encoding" => descriptor.encoding = value.parse()?,
                "data" => descriptor.body = value,
                "custom-headers" => descriptor.custom_headers = value,
                "cookie" => descriptor.cookie = value,
                "proxy" => descriptor.proxy = value,
                _ => {}
            }
        }
        Ok(descriptor)
    }

    /// Query parameters in the order the backend expects them.
    pub fn query_pairs(&self) -> [(&'static str, &str); 7] {
        [
            ("url", self.url.as_str()),
            ("method", self.method.as_str()),
            ("encoding", self.encoding.as_str()),
            ("data", self.body.as_str()),
            ("custom_headers", self.custom_headers.as_str()),
            ("cookie", self.cookie.as_str()),
            ("proxy", self.proxy.as_str()),
        ]
    }

    /// Full endpoint URL under `base`, each value percent-encoded on its own.
    pub fn request_url(&self, base: &Url) -> Result<Url> {
        let mut url = base.join(REQUEST_PATH)?;
        url.query_pairs_mut().clear().extend_pairs(self.query_pairs());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{Encoding, Method, RequestDescriptor};
    use crate::RelayError;

    fn path_and_query(url: &Url) -> String {
        format!("{}?{}", url.path(), url.query().unwrap_or_default())
    }

    #[test]
    fn request_url_encodes_every_field() {
        let base = Url::parse("http://backend.local:8015").unwrap();
        let url = RequestDescriptor::new("http://x.test")
            .request_url(&base)
            .unwrap();

        assert_eq!(
            path_and_query(&url),
            "/request?url=http%3A%2F%2Fx.test&method=GET&encoding=utf-8&data=&custom_headers=&cookie=&proxy="
        );
    }

    #[test]
    fn request_url_escapes_reserved_characters_in_free_form_fields() {
        let base = Url::parse("http://backend.local/").unwrap();
        let url = RequestDescriptor::new("http://x.test/?a=1&b=2")
            .method(Method::Post)
            .body("k=v&x=y")
            .cookie("sid=abc; theme=dark")
            .request_url(&base)
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.len(), 7);
        assert_eq!(pairs[0].1, "http://x.test/?a=1&b=2");
        assert_eq!(pairs[1].1, "POST");
        assert_eq!(pairs[3].1, "k=v&x=y");
        assert_eq!(pairs[5].1, "sid=abc; theme=dark");
        assert!(!url.query().unwrap().contains("a=1&b=2"));
    }

    #[test]
    fn request_path_replaces_base_path() {
        let base = Url::parse("http://backend.local/ui/index.html").unwrap();
        let url = RequestDescriptor::new("http://x.test")
            .request_url(&base)
            .unwrap();
        assert_eq!(url.path(), "/request");
    }

    #[test]
    fn from_form_maps_input_names() {
        let descriptor = RequestDescriptor::from_form([
            ("url", "http://x.test"),
            ("method", "PUT"),
            ("encoding", "gbk"),
            ("data", "payload"),
            ("custom-headers", "X-A: 1"),
            ("cookie", "a=b"),
            ("proxy", "http://127.0.0.1:8080"),
            ("submit", "Send"),
        ])
        .unwrap();

        assert_eq!(
            descriptor,
            RequestDescriptor::new("http://x.test")
                .method(Method::Put)
                .encoding(Encoding::Gbk)
                .body("payload")
                .custom_headers("X-A: 1")
                .cookie("a=b")
                .proxy("http://127.0.0.1:8080")
        );
    }

    #[test]
    fn from_form_defaults_missing_fields() {
        let descriptor = RequestDescriptor::from_form([("url", "http://x.test")]).unwrap();
        assert_eq!(descriptor.method, Method::Get);
        assert_eq!(descriptor.encoding, Encoding::Utf8);
        assert!(descriptor.body.is_empty());
    }

    #[test]
    fn from_form_rejects_unknown_method() {
        let err = RequestDescriptor::from_form([("method", "FETCH")]).unwrap_err();
        match err {
            RelayError::InvalidField { field, value } => {
                assert_eq!(field, "method");
                assert_eq!(value, "FETCH");
            }
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn method_and_encoding_parse_case_insensitively() {
        assert_eq!("delete".parse::<Method>().unwrap(), Method::Delete);
        assert_eq!("Shift-JIS".parse::<Encoding>().unwrap(), Encoding::ShiftJis);
        assert!("utf-7".parse::<Encoding>().is_err());
    }
}
