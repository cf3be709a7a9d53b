//! Abstraction over the actual browser process so the session manager and
//! action engine never touch `chromiumoxide` types directly. Grounded on
//! the `BrowserActionExecutor` trait's start/execute/shutdown shape, kept
//! async and per-page. One `BrowserBackend` is one browser process,
//! exclusively owned by the session that launched it; a `BrowserLauncher`
//! is the factory the session manager calls once per `create()` so every
//! session gets its own process rather than sharing one.

use async_trait::async_trait;
use serde_json::Value;

use jarvis_model::JarvisError;

/// One browser process capable of handing out independent pages (tabs).
#[async_trait]
pub trait BrowserBackend: Send + Sync {
    async fn open_page(&self) -> Result<Box<dyn BackendPage>, JarvisError>;
}

/// Launches one exclusively-owned `BrowserBackend` per call. The session
/// manager calls this once per `create()`, not once at process bootstrap,
/// so each session's browser is its own process with its own lifetime.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<std::sync::Arc<dyn BrowserBackend>, JarvisError>;
}

/// One tab. Every method maps 1:1 onto an `ActionKind` in the data model.
#[async_trait]
pub trait BackendPage: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), JarvisError>;
    async fn click(&self, selector: &str) -> Result<(), JarvisError>;
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), JarvisError>;
    async fn wait_for(&self, selector: &str) -> Result<(), JarvisError>;
    async fn select(&self, selector: &str, value: &str) -> Result<(), JarvisError>;
    async fn evaluate(&self, script: &str) -> Result<Value, JarvisError>;
    async fn screenshot(&self) -> Result<Vec<u8>, JarvisError>;
    async fn pdf(&self) -> Result<Vec<u8>, JarvisError>;
    async fn close(&self) -> Result<(), JarvisError>;
}

pub mod chromium {
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
    use chromiumoxide::page::ScreenshotParams;
    use chromiumoxide::Page;
    use serde_json::Value;
    use tracing::{error, warn};

    use jarvis_model::JarvisError;

    use super::{BackendPage, BrowserBackend};

    fn backend_unavailable(err: impl std::fmt::Display) -> JarvisError {
        JarvisError::ExternalService(format!("browser backend error: {err}"))
    }

    /// Launches and owns a single headless Chromium process for exactly one
    /// session; dropping it kills the process. The CDP event loop is driven
    /// by a background task spawned alongside the browser; if that task
    /// dies the backend stops producing usable pages, which surfaces to
    /// callers as `ExternalService` errors rather than a silent hang.
    pub struct ChromiumBackend {
        browser: Browser,
    }

    impl ChromiumBackend {
        /// Launches with the fixed hardening flag set: no sandbox (this
        /// runs as root in containers) and no `/dev/shm` dependency (which
        /// is too small in most container runtimes and crashes the
        /// renderer under load).
        pub async fn launch() -> Result<Self, JarvisError> {
            let config = BrowserConfig::builder()
                .no_sandbox()
                .arg("--disable-dev-shm-usage")
                .arg("--disable-gpu")
                .build()
                .map_err(|err| backend_unavailable(format!("invalid browser config: {err}")))?;
            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(backend_unavailable)?;
            tokio::spawn(async move {
                while let Some(event) = futures_util::StreamExt::next(&mut handler).await {
                    if let Err(err) = event {
                        warn!(error = %err, "chromium handler event error");
                    }
                }
                error!("chromium CDP event loop ended");
            });
            Ok(Self { browser })
        }
    }

    /// Launches one fresh [`ChromiumBackend`] per call, so every session
    /// gets its own exclusively-owned browser process per spec.
    #[derive(Default, Clone, Copy)]
    pub struct ChromiumLauncher;

    #[async_trait]
    impl super::BrowserLauncher for ChromiumLauncher {
        async fn launch(&self) -> Result<std::sync::Arc<dyn BrowserBackend>, JarvisError> {
            let backend = ChromiumBackend::launch().await?;
            Ok(std::sync::Arc::new(backend))
        }
    }

    #[async_trait]
    impl BrowserBackend for ChromiumBackend {
        async fn open_page(&self) -> Result<Box<dyn BackendPage>, JarvisError> {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(backend_unavailable)?;
            Ok(Box::new(ChromiumPage { page }))
        }
    }

    struct ChromiumPage {
        page: Page,
    }

    #[async_trait]
    impl BackendPage for ChromiumPage {
        async fn goto(&self, url: &str) -> Result<(), JarvisError> {
            self.page.goto(url).await.map_err(backend_unavailable)?;
            self.page.wait_for_navigation().await.map_err(backend_unavailable)?;
            Ok(())
        }

        async fn click(&self, selector: &str) -> Result<(), JarvisError> {
            let element = self.page.find_element(selector).await.map_err(backend_unavailable)?;
            element.click().await.map_err(backend_unavailable)?;
            Ok(())
        }

        async fn type_text(&self, selector: &str, text: &str) -> Result<(), JarvisError> {
            let element = self.page.find_element(selector).await.map_err(backend_unavailable)?;
            element.click().await.map_err(backend_unavailable)?;
            element.type_str(text).await.map_err(backend_unavailable)?;
            Ok(())
        }

        async fn wait_for(&self, selector: &str) -> Result<(), JarvisError> {
            self.page.find_element(selector).await.map_err(backend_unavailable)?;
            Ok(())
        }

        async fn select(&self, selector: &str, value: &str) -> Result<(), JarvisError> {
            let element = self.page.find_element(selector).await.map_err(backend_unavailable)?;
            let script = format!(
                "(() => {{ const el = document.querySelector({selector:?}); el.value = {value:?}; \
                 el.dispatchEvent(new Event('change')); return true; }})()",
                selector = selector,
                value = value,
            );
            let _ = element;
            self.page
                .evaluate(script)
                .await
                .map_err(backend_unavailable)?;
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<Value, JarvisError> {
            let result = self.page.evaluate(script).await.map_err(backend_unavailable)?;
            result.into_value().map_err(backend_unavailable)
        }

        async fn screenshot(&self) -> Result<Vec<u8>, JarvisError> {
            self.page
                .screenshot(ScreenshotParams::builder().build())
                .await
                .map_err(backend_unavailable)
        }

        async fn pdf(&self) -> Result<Vec<u8>, JarvisError> {
            self.page
                .pdf(PrintToPdfParams::default())
                .await
                .map_err(backend_unavailable)
        }

        async fn close(&self) -> Result<(), JarvisError> {
            self.page.close().await.map_err(backend_unavailable)?;
            Ok(())
        }
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use jarvis_model::JarvisError;

    use super::{BackendPage, BrowserBackend, BrowserLauncher};

    /// In-memory backend used by session manager and action engine tests so
    /// suites never need a real Chromium binary on `PATH`.
    #[derive(Default)]
    pub struct FakeBackend {
        pub fail_open_page: AtomicBool,
        pub pages_opened: AtomicUsize,
        pub pages_closed: Arc<AtomicUsize>,
        /// Artificial delay every page operation sleeps before returning;
        /// lets a test trip the action engine's timeout deterministically.
        pub op_delay_ms: Arc<AtomicU64>,
    }

    #[async_trait]
    impl BrowserBackend for FakeBackend {
        async fn open_page(&self) -> Result<Box<dyn BackendPage>, JarvisError> {
            if self.fail_open_page.load(Ordering::SeqCst) {
                return Err(JarvisError::ExternalService("fake backend: open_page failed".into()));
            }
            self.pages_opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakePage {
                current_url: Mutex::new(String::from("about:blank")),
                closed: AtomicBool::new(false),
                pages_closed: self.pages_closed.clone(),
                op_delay_ms: self.op_delay_ms.clone(),
            }))
        }
    }

    /// Hands out a fresh [`FakeBackend`] per `launch()` call, the same
    /// one-browser-per-session shape [`super::chromium::ChromiumLauncher`]
    /// gives the real backend. Tests that need to assert on a specific
    /// session's backend (page-open/close counts, a failure flag) construct
    /// a [`FakeBackend`] directly and wrap it in a [`SingleBackendLauncher`]
    /// instead.
    #[derive(Default)]
    pub struct FakeLauncher;

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self) -> Result<Arc<dyn BrowserBackend>, JarvisError> {
            Ok(Arc::new(FakeBackend::default()))
        }
    }

    /// Always hands out the same pre-built backend, so a test can share one
    /// `FakeBackend` across every session a `SessionManager` creates and
    /// assert on its counters/failure flag afterward.
    pub struct SingleBackendLauncher(pub Arc<FakeBackend>);

    #[async_trait]
    impl BrowserLauncher for SingleBackendLauncher {
        async fn launch(&self) -> Result<Arc<dyn BrowserBackend>, JarvisError> {
            Ok(self.0.clone() as Arc<dyn BrowserBackend>)
        }
    }

    struct FakePage {
        current_url: Mutex<String>,
        closed: AtomicBool,
        pages_closed: Arc<AtomicUsize>,
        op_delay_ms: Arc<AtomicU64>,
    }

    impl FakePage {
        async fn delay(&self) {
            let ms = self.op_delay_ms.load(Ordering::SeqCst);
            if ms > 0 {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
        }
    }

    #[async_trait]
    impl BackendPage for FakePage {
        async fn goto(&self, url: &str) -> Result<(), JarvisError> {
            self.delay().await;
            *self.current_url.lock().unwrap() = url.to_string();
            Ok(())
        }

        async fn click(&self, _selector: &str) -> Result<(), JarvisError> {
            Ok(())
        }

        async fn type_text(&self, _selector: &str, _text: &str) -> Result<(), JarvisError> {
            Ok(())
        }

        async fn wait_for(&self, selector: &str) -> Result<(), JarvisError> {
            if selector.trim().is_empty() {
                return Err(JarvisError::Validation("selector must not be empty".into()));
            }
            Ok(())
        }

        async fn select(&self, _selector: &str, _value: &str) -> Result<(), JarvisError> {
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> Result<Value, JarvisError> {
            Ok(json!({ "echo": script }))
        }

        async fn screenshot(&self) -> Result<Vec<u8>, JarvisError> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }

        async fn pdf(&self) -> Result<Vec<u8>, JarvisError> {
            Ok(vec![b'%', b'P', b'D', b'F'])
        }

        async fn close(&self) -> Result<(), JarvisError> {
            self.closed.store(true, Ordering::SeqCst);
            self.pages_closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
