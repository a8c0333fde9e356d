//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod raw_server;
pub mod socket_guard;

/// Share page whose embedded state carries `download_url` and whose title names the file.
pub fn share_page(title: &str, download_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>{title} - Share Files Online &amp; Send Large Files with TeraBox</title>
  <script src="https://static.example-cdn.com/app.js"></script>
</head>
<body>
  <a href="https://ads.example.com/click">Download faster</a>
  <script>
    window.yunData = {{"share_id": 7, "file_list": [{{"server_filename": "{title}", "dlink": "{download_url}"}}],}};
  </script>
</body>
</html>"#
    )
}
