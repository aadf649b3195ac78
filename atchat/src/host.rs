//! The workspace side of the bridge: file listing and file reads.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::protocol::{HostMessage, SessionEvent, UiMessage};

/// Enumerates workspace files.
pub trait FileIndex: Send + Sync {
    /// Every file under the root, relative, `/`-separated.
    fn list_files(&self) -> Vec<String>;
}

/// Reads one workspace file by relative path.
pub trait FileResolver: Send + Sync {
    /// `None` when the file is missing or unreadable.
    fn read_file(&self, filename: &str) -> Option<String>;
}

/// Handle the UI uses to reach the host. Responses come back asynchronously
/// as [`SessionEvent::Host`].
pub trait HostBridge: Send + Sync {
    fn post(&self, message: UiMessage);
}

/// Answer a single UI request synchronously.
pub fn answer<H>(host: &H, message: &UiMessage) -> HostMessage
where
    H: FileIndex + FileResolver + ?Sized,
{
    match message {
        UiMessage::ReadFile {
            filename,
            request_id,
        } => match host.read_file(filename) {
            Some(content) => HostMessage::FileContent {
                content,
                request_id: *request_id,
            },
            None => HostMessage::FileNotFound {
                request_id: *request_id,
            },
        },
        UiMessage::RequestFileList { request_id } => HostMessage::FileList {
            files: host.list_files(),
            request_id: *request_id,
        },
    }
}

/// A workspace rooted at the first folder the session was opened with.
#[derive(Clone, Debug, Default)]
pub struct Workspace {
    root: Option<PathBuf>,
}

impl Workspace {
    /// Only the first root is used; later ones are ignored.
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            root: roots.into_iter().next(),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Resolve `filename` under the root. Absolute paths and paths that climb
    /// out of the root through `..` do not resolve.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let root = self.root.as_deref()?;
        if filename.is_empty() {
            return None;
        }
        let rel = Path::new(filename);
        let mut depth = 0usize;
        for component in rel.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                Component::ParentDir => depth = depth.checked_sub(1)?,
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(root.join(rel))
    }
}

impl FileIndex for Workspace {
    fn list_files(&self) -> Vec<String> {
        let Some(root) = self.root.as_deref() else {
            return Vec::new();
        };

        // No ignore rules at all: hidden, gitignored and dependency files are listed too.
        let walker = ignore::WalkBuilder::new(root)
            .standard_filters(false)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(rel);
        }
        files.sort();
        tracing::debug!(count = files.len(), root = %root.display(), "listed workspace");
        files
    }
}

impl FileResolver for Workspace {
    fn read_file(&self, filename: &str) -> Option<String> {
        let path = self.resolve(filename)?;
        match std::fs::read(&path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::debug!(path = %path.display(), "read failed: {e}");
                None
            }
        }
    }
}

/// In-process host: answers each request on a blocking task and sends the
/// reply into the session's event channel.
pub struct LocalBridge<W = Workspace> {
    workspace: Arc<W>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<W> LocalBridge<W> {
    pub fn new(workspace: Arc<W>, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { workspace, events }
    }
}

impl<W> HostBridge for LocalBridge<W>
where
    W: FileIndex + FileResolver + 'static,
{
    fn post(&self, message: UiMessage) {
        let workspace = Arc::clone(&self.workspace);
        let events = self.events.clone();
        tokio::task::spawn_blocking(move || {
            let reply = answer(workspace.as_ref(), &message);
            let _ = events.send(SessionEvent::Host(reply));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::new([dir.path().to_path_buf()])
    }

    #[test]
    fn lists_recursively_with_forward_slashes() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("b/deep")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("b/c.txt"), "").unwrap();
        std::fs::write(dir.path().join("b/deep/d.rs"), "").unwrap();
        assert_eq!(
            workspace(&dir).list_files(),
            vec!["a.txt", "b/c.txt", "b/deep/d.rs"]
        );
    }

    #[test]
    fn listing_applies_no_exclusions() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join(".gitignore"), "node_modules/\n*.log\n").unwrap();
        std::fs::write(dir.path().join(".env"), "").unwrap();
        std::fs::write(dir.path().join("run.log"), "").unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "").unwrap();
        let files = workspace(&dir).list_files();
        assert!(files.contains(&".gitignore".to_string()));
        assert!(files.contains(&".env".to_string()));
        assert!(files.contains(&"run.log".to_string()));
        assert!(files.contains(&"node_modules/pkg/index.js".to_string()));
    }

    #[test]
    fn listing_skips_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        assert!(workspace(&dir).list_files().is_empty());
    }

    #[test]
    fn no_root_means_nothing_resolves() {
        let ws = Workspace::default();
        assert!(ws.list_files().is_empty());
        assert!(ws.read_file("anything").is_none());
    }

    #[test]
    fn only_first_root_is_used() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(second.path().join("only-here.txt"), "x").unwrap();
        let ws = Workspace::new([first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(ws.root(), Some(first.path()));
        assert!(ws.read_file("only-here.txt").is_none());
    }

    #[test]
    fn reads_relative_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/notes.md"), "hello").unwrap();
        assert_eq!(
            workspace(&dir).read_file("docs/notes.md").as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn non_utf8_content_is_decoded_lossily() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blob.bin"), [b'o', b'k', 0xff]).unwrap();
        assert_eq!(
            workspace(&dir).read_file("blob.bin").as_deref(),
            Some("ok\u{fffd}")
        );
    }

    #[test]
    fn escaping_paths_do_not_resolve() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir);
        assert!(ws.resolve("../secret").is_none());
        assert!(ws.resolve("a/../../secret").is_none());
        assert!(ws.resolve("/etc/passwd").is_none());
        assert!(ws.resolve("").is_none());
        assert!(ws.resolve("a/../b.txt").is_some());
    }

    #[test]
    fn directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        assert!(workspace(&dir).read_file("src").is_none());
    }

    #[test]
    fn answer_maps_requests_to_replies() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        let ws = workspace(&dir);

        let found = answer(
            &ws,
            &UiMessage::ReadFile {
                filename: "a.txt".into(),
                request_id: RequestId(1),
            },
        );
        assert_eq!(
            found,
            HostMessage::FileContent {
                content: "A".into(),
                request_id: RequestId(1)
            }
        );

        let missing = answer(
            &ws,
            &UiMessage::ReadFile {
                filename: "nope.txt".into(),
                request_id: RequestId(2),
            },
        );
        assert_eq!(
            missing,
            HostMessage::FileNotFound {
                request_id: RequestId(2)
            }
        );

        let list = answer(
            &ws,
            &UiMessage::RequestFileList {
                request_id: RequestId(3),
            },
        );
        assert_eq!(
            list,
            HostMessage::FileList {
                files: vec!["a.txt".into()],
                request_id: RequestId(3)
            }
        );
    }

    #[tokio::test]
    async fn local_bridge_replies_on_channel() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bridge = LocalBridge::new(Arc::new(workspace(&dir)), tx);
        bridge.post(UiMessage::ReadFile {
            filename: "a.txt".into(),
            request_id: RequestId(5),
        });
        match rx.recv().await {
            Some(SessionEvent::Host(HostMessage::FileContent {
                content,
                request_id,
            })) => {
                assert_eq!(content, "A");
                assert_eq!(request_id, RequestId(5));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
