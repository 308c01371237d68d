//! Static info-page lookup.
//!
//! The info browser in the client requests pages by relative path. Pages
//! live under a content root on disk; a missing page falls back to a
//! built-in placeholder document. Traversal sequences are neutralized
//! before the path ever reaches the filesystem.

use std::path::PathBuf;

/// Placeholder document served when a requested page is absent.
const DEFAULT_PAGE: &[u8] = br##"<HTML>
<HEAD><TITLE>information</TITLE>
<meta http-equiv="Content-Type" content="text/html; charset=Shift_JIS"></HEAD>
<BODY bgcolor="#000033" text=#FFFFFF>
<table width=584 cellspacing=30 cellpadding=0>
  <tr><td width=256 height=32 align=center>INFORMATION</td></tr>
  <tr><td width=256 height=32 align=center>RANKING</td></tr>
  <tr><td width=256 height=32 align=center>TERMS OF USE</td></tr>
  <tr><td width=256 height=32 align=center>REGISTER / CHANGE</td></tr>
</table>
</BODY>
</HTML>"##;

/// Serves info pages from a directory with a placeholder fallback.
pub struct InfoPages {
    root: PathBuf,
}

impl InfoPages {
    /// Creates a page source rooted at `root` ("htm" in a standard
    /// deployment).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the page bytes for a client-supplied relative path.
    ///
    /// `..` sequences are replaced before lookup so the path can never
    /// escape the content root. Read failures serve the placeholder.
    pub async fn get(&self, url: &[u8]) -> Vec<u8> {
        let sanitized =
            String::from_utf8_lossy(url).replace("..", "X");
        let path = self.root.join(&sanitized);
        match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(?path, %err, "info page missing, serving default");
                DEFAULT_PAGE.to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_page_serves_default() {
        let pages = InfoPages::new("/nonexistent-root");
        let data = pages.get(b"INFOR00.HTM").await;
        assert_eq!(data, DEFAULT_PAGE);
    }

    #[tokio::test]
    async fn test_get_neutralizes_traversal() {
        let dir = std::env::temp_dir().join("parlor-info-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let secret = std::env::temp_dir().join("parlor-secret.txt");
        tokio::fs::write(&secret, b"secret").await.unwrap();

        let pages = InfoPages::new(&dir);
        let data = pages.get(b"../parlor-secret.txt").await;
        // The traversal is rewritten, so lookup misses and the default
        // is served instead of the file outside the root.
        assert_eq!(data, DEFAULT_PAGE);
    }

    #[tokio::test]
    async fn test_get_existing_page_served() {
        let dir = std::env::temp_dir().join("parlor-info-test-pages");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("PAGE.HTM"), b"<HTML>hi</HTML>")
            .await
            .unwrap();

        let pages = InfoPages::new(&dir);
        assert_eq!(pages.get(b"PAGE.HTM").await, b"<HTML>hi</HTML>");
    }
}
