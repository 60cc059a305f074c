use chrono::{DateTime, Utc};

use crate::param::{Status, CRLF, HTTP_VERSION, SERVER_NAME};

pub struct HtmlBuilder {
    title: String,
    css: String,
    body: String,
}

impl HtmlBuilder {
    pub fn from_status(status: Status) -> Self {
        let title = status.to_string();
        let css = r"
            body {
                width: 35em;
                margin: 0 auto;
                font-family: Tahoma, Verdana, Arial, sans-serif;
            }
            "
        .to_string();
        let body = format!(
            r"
            <h1>{}</h1>
            <p>{}</p>
            ",
            status,
            describe(status)
        );
        Self { title, css, body }
    }

    /// 目录列表。`names` 由调用方排好序，不包含 `.`
    pub fn from_dir(uri: &str, names: &[String]) -> Self {
        let base = uri.trim_end_matches('/');
        let mut body = String::new();
        body.push_str(&format!("<h1>Index of {}</h1><hr>\n", escape(uri)));
        body.push_str("<ul>\n");
        for name in names {
            body.push_str(&format!(
                "<li><a href=\"{}/{}\">{}</a></li>\n",
                escape(base),
                escape(name),
                escape(name)
            ));
        }
        body.push_str("</ul>\n");
        Self {
            title: format!("Index of {}", escape(uri)),
            css: String::new(),
            body,
        }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
<html>
    <head>
        <meta charset="utf-8">
        <title>{}</title>
        <style>{}</style>
    </head>
    <body>
    {}
    </body>
</html>
"##,
            self.title, self.css, self.body
        )
    }
}

fn describe(status: Status) -> &'static str {
    match status {
        Status::Ok => "请求已成功处理。",
        Status::BadRequest => "服务器无法理解这个请求。",
        Status::NotFound => "你指定的资源无法找到。",
        Status::InternalServerError => "服务器出现了一个内部错误。",
    }
}

/// 转义 HTML 特殊字符
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 构造响应头：状态行、`Content-Type`、`Server`、`Date` 以及结尾的空行
pub fn response_head(status: Status, content_type: &str) -> String {
    let status_line: &str = &status.to_string();
    let date: &str = &format_date(&Utc::now());
    [
        HTTP_VERSION,
        " ",
        status_line,
        CRLF,
        "Content-Type: ",
        content_type,
        CRLF,
        "Server: ",
        SERVER_NAME,
        CRLF,
        "Date: ",
        date,
        CRLF,
        CRLF,
    ]
    .concat()
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}
