//! Playwright-backed sessions
//!
//! Every session operation runs as its own `node` script: launch the
//! configured browser, replay the operations that already succeeded on this
//! session, run the new one, close the browser. The replayed history is what
//! gives a session its continuity (page, form state, cookies) across calls.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info};

use parasuite_common::{BrowserKind, Session, SessionConfig, SessionFactory, SessionRef, WindowState};

use crate::error::{E2eError, E2eResult};
use crate::spec::{TestStep, WaitState};

/// Configuration for Playwright
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Relative step URLs resolve against this
    pub base_url: String,

    /// Parent directory for per-session scratch directories
    pub scratch_dir: PathBuf,

    pub viewport_width: u32,
    pub viewport_height: u32,
    pub headless: bool,

    /// Node executable used to run generated scripts
    pub node_binary: String,

    /// Exported as `NODE_PATH` so scripts can resolve `playwright`
    pub node_path: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            scratch_dir: PathBuf::from("test-results/sessions"),
            viewport_width: 1280,
            viewport_height: 720,
            headless: true,
            node_binary: "node".to_string(),
            node_path: None,
        }
    }
}

/// Browser launch parameters baked into every generated script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub maximized: bool,
    pub implicit_wait_ms: u64,
    pub base_url: String,
}

impl LaunchOptions {
    pub fn new(config: &PlaywrightConfig, session: &SessionConfig) -> Self {
        Self {
            browser: session.browser,
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            maximized: session.window_state == WindowState::Maximized,
            implicit_wait_ms: session.implicit_wait_ms,
            base_url: config.base_url.clone(),
        }
    }
}

/// Quote `s` as a JavaScript string literal.
pub fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Build a complete node script running `fragments` in order on one page.
pub fn build_script(launch: &LaunchOptions, fragments: &[String]) -> String {
    let (launch_args, viewport) = if launch.maximized {
        ("['--start-maximized']".to_string(), "null".to_string())
    } else {
        (
            "[]".to_string(),
            format!(
                "{{ width: {}, height: {} }}",
                launch.viewport_width, launch.viewport_height
            ),
        )
    };
    let timeout = if launch.implicit_wait_ms > 0 {
        format!("\n  page.setDefaultTimeout({});", launch.implicit_wait_ms)
    } else {
        String::new()
    };

    let mut script = format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const {{ expect }} = require('@playwright/test');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless}, args: {args} }});
  const context = await browser.newContext({{ viewport: {viewport} }});
  const page = await context.newPage();{timeout}
  const baseUrl = {base_url};

  try {{
"#,
        browser = launch.browser.as_str(),
        headless = launch.headless,
        args = launch_args,
        viewport = viewport,
        timeout = timeout,
        base_url = js_string(&launch.base_url),
    );

    for fragment in fragments {
        script.push_str(fragment);
        script.push('\n');
    }

    script.push_str(
        r#"
    console.log(JSON.stringify({ success: true }));
  } catch (error) {
    console.error(JSON.stringify({ success: false, error: error.message }));
    process.exit(1);
  } finally {
    await browser.close();
  }
})();
"#,
    );

    script
}

/// Short label for a step, used in logs and failure messages
pub fn step_name(step: &TestStep) -> String {
    match step {
        TestStep::Navigate { url, .. } => format!("navigate:{}", url),
        TestStep::Click { selector, .. } => format!("click:{}", selector),
        TestStep::Fill { selector, .. } => format!("fill:{}", selector),
        TestStep::Type { selector, .. } => format!("type:{}", selector),
        TestStep::Press { key, .. } => format!("press:{}", key),
        TestStep::Wait { selector, .. } => format!("wait:{}", selector),
        TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
        TestStep::Assert { selector, .. } => format!("assert:{}", selector),
        TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
        TestStep::Hover { selector } => format!("hover:{}", selector),
        TestStep::Focus { selector } => format!("focus:{}", selector),
        TestStep::Select { selector, .. } => format!("select:{}", selector),
        TestStep::Check { selector } => format!("check:{}", selector),
        TestStep::Uncheck { selector } => format!("uncheck:{}", selector),
        TestStep::Evaluate { .. } => "evaluate".to_string(),
        TestStep::Log { message } => {
            format!("log:{}", message.chars().take(30).collect::<String>())
        }
    }
}

pub fn navigate_js(url: &str) -> String {
    format!(
        "    await page.goto(new URL({}, baseUrl).toString());",
        js_string(url)
    )
}

pub fn wait_for_js(selector: &str) -> String {
    format!("    await page.waitForSelector({});", js_string(selector))
}

pub fn screenshot_js(path: &Path, selector: Option<&str>, full_page: bool) -> String {
    let path = js_string(&path.to_string_lossy());
    match selector {
        Some(sel) => format!(
            "    await page.locator({}).screenshot({{ path: {} }});",
            js_string(sel),
            path
        ),
        None => format!(
            "    await page.screenshot({{ path: {}, fullPage: {} }});",
            path, full_page
        ),
    }
}

/// Convert a step to a script fragment.
///
/// `None` for steps the caller performs itself (sleep, log, screenshot).
pub fn step_to_js(step: &TestStep, step_index: usize) -> Option<String> {
    let js = match step {
        TestStep::Navigate {
            url,
            wait_for_selector,
        } => {
            let wait = wait_for_selector
                .as_ref()
                .map(|s| format!("\n{}", wait_for_js(s)))
                .unwrap_or_default();
            format!("{}{}", navigate_js(url), wait)
        }
        TestStep::Click {
            selector,
            timeout_ms,
        } => {
            let timeout = timeout_ms.unwrap_or(5000);
            format!(
                "    await page.click({}, {{ timeout: {} }});",
                js_string(selector),
                timeout
            )
        }
        TestStep::Fill {
            selector,
            value,
            clear_first,
        } => {
            let sel = js_string(selector);
            if *clear_first {
                format!(
                    "    await page.fill({}, '');\n    await page.fill({}, {});",
                    sel,
                    sel,
                    js_string(value)
                )
            } else {
                format!("    await page.fill({}, {});", sel, js_string(value))
            }
        }
        TestStep::Type {
            selector,
            text,
            delay_ms,
        } => format!(
            "    await page.type({}, {}, {{ delay: {} }});",
            js_string(selector),
            js_string(text),
            delay_ms.unwrap_or(50)
        ),
        TestStep::Press { selector, key } => match selector {
            Some(sel) => format!(
                "    await page.locator({}).press({});",
                js_string(sel),
                js_string(key)
            ),
            None => format!("    await page.keyboard.press({});", js_string(key)),
        },
        TestStep::Wait {
            selector,
            timeout_ms,
            state,
        } => {
            let state = match state {
                WaitState::Visible => "visible",
                WaitState::Hidden => "hidden",
                WaitState::Attached => "attached",
                WaitState::Detached => "detached",
            };
            format!(
                "    await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
                js_string(selector),
                state,
                timeout_ms
            )
        }
        TestStep::Assert {
            selector,
            visible,
            text,
            text_contains,
            attribute,
            count,
        } => {
            let locator = format!("page.locator({})", js_string(selector));
            let mut assertions = Vec::new();

            match visible {
                Some(true) => {
                    assertions.push(format!("    await expect({}).toBeVisible();", locator))
                }
                Some(false) => {
                    assertions.push(format!("    await expect({}).toBeHidden();", locator))
                }
                None => {}
            }
            if let Some(t) = text {
                assertions.push(format!(
                    "    await expect({}).toHaveText({});",
                    locator,
                    js_string(t)
                ));
            }
            if let Some(tc) = text_contains {
                assertions.push(format!(
                    "    await expect({}).toContainText({});",
                    locator,
                    js_string(tc)
                ));
            }
            if let Some(attr) = attribute {
                if let Some(val) = &attr.value {
                    assertions.push(format!(
                        "    await expect({}).toHaveAttribute({}, {});",
                        locator,
                        js_string(&attr.name),
                        js_string(val)
                    ));
                } else if let Some(part) = &attr.contains {
                    assertions.push(format!(
                        "    await expect({}).toHaveAttribute({}, new RegExp({}));",
                        locator,
                        js_string(&attr.name),
                        js_string(&escape_regex(part))
                    ));
                }
            }
            if let Some(c) = count {
                assertions.push(format!("    await expect({}).toHaveCount({});", locator, c));
            }
            if assertions.is_empty() {
                assertions.push(format!("    await expect({}).toBeAttached();", locator));
            }

            assertions.join("\n")
        }
        TestStep::Hover { selector } => format!("    await page.hover({});", js_string(selector)),
        TestStep::Focus { selector } => format!("    await page.focus({});", js_string(selector)),
        TestStep::Select { selector, value } => format!(
            "    await page.selectOption({}, {});",
            js_string(selector),
            js_string(value)
        ),
        TestStep::Check { selector } => format!("    await page.check({});", js_string(selector)),
        TestStep::Uncheck { selector } => {
            format!("    await page.uncheck({});", js_string(selector))
        }
        TestStep::Evaluate { script, expected } => {
            let mut js = format!(
                "    const result_{} = await page.evaluate(() => {{ {} }});",
                step_index, script
            );
            if let Some(expected) = expected {
                let expected = js_string(&expected.to_string());
                js.push_str(&format!(
                    "\n    if (JSON.stringify(result_{i}) !== {e}) {{ throw new Error('evaluate returned ' + JSON.stringify(result_{i}) + ', expected ' + {e}); }}",
                    i = step_index,
                    e = expected
                ));
            }
            js
        }
        TestStep::Sleep { .. } | TestStep::Log { .. } | TestStep::Screenshot { .. } => {
            return None
        }
    };
    Some(js)
}

fn escape_regex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\^$.|?*+()[]{}/".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Deserialize)]
struct ScriptFailure {
    error: String,
}

/// Error message reported by a failed script.
fn failure_message(stdout: &str, stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .filter_map(|line| serde_json::from_str::<ScriptFailure>(line.trim()).ok())
        .map(|f| f.error)
        .next()
        .unwrap_or_else(|| {
            format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout.trim(),
                stderr.trim()
            )
        })
}

/// Session driven through generated Playwright scripts.
pub struct PlaywrightSession {
    label: String,
    launch: LaunchOptions,
    node_binary: String,
    node_path: Option<PathBuf>,
    /// `None` once closed
    scratch: Mutex<Option<TempDir>>,
    history: Mutex<Vec<String>>,
    ops: AtomicUsize,
}

impl PlaywrightSession {
    fn scratch_path(&self) -> E2eResult<PathBuf> {
        self.scratch
            .lock()
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .ok_or(E2eError::SessionClosed)
    }

    /// Run the recorded history followed by `fragment`.
    ///
    /// With `record`, a successful `fragment` joins the history.
    async fn run(&self, fragment: String, record: bool) -> E2eResult<()> {
        let scratch = self.scratch_path()?;
        let op = self.ops.fetch_add(1, Ordering::Relaxed) + 1;

        let mut fragments = self.history.lock().clone();
        fragments.push(fragment);
        let script = build_script(&self.launch, &fragments);

        let script_path = scratch.join(format!("op-{:04}.js", op));
        tokio::fs::write(&script_path, script).await?;

        debug!(session = %self.label, "Running Playwright script: {}", script_path.display());

        let mut command = TokioCommand::new(&self.node_binary);
        command.arg(&script_path).current_dir(&scratch);
        if let Some(node_path) = &self.node_path {
            command.env("NODE_PATH", node_path);
        }
        let output = command.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(E2eError::Playwright(failure_message(&stdout, &stderr)));
        }

        if record {
            if let Some(fragment) = fragments.pop() {
                self.history.lock().push(fragment);
            }
        }
        Ok(())
    }

    async fn take_snapshot(&self) -> E2eResult<Vec<u8>> {
        let scratch = self.scratch_path()?;
        let path = scratch.join(format!(
            "snapshot-{:04}.png",
            self.ops.load(Ordering::Relaxed) + 1
        ));

        self.run(screenshot_js(&path, None, false), false).await?;

        let data = tokio::fs::read(&path).await?;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(session = %self.label, "Could not remove snapshot {:?}: {}", path, e);
        }
        Ok(data)
    }

    fn shutdown(&self) -> E2eResult<()> {
        let dir = self.scratch.lock().take().ok_or(E2eError::SessionClosed)?;
        self.history.lock().clear();
        dir.close()?;
        debug!(session = %self.label, "Session closed");
        Ok(())
    }
}

#[async_trait]
impl Session for PlaywrightSession {
    async fn navigate(&self, url: &str) -> parasuite_common::Result<()> {
        Ok(self.run(navigate_js(url), true).await?)
    }

    async fn snapshot(&self) -> parasuite_common::Result<Vec<u8>> {
        Ok(self.take_snapshot().await?)
    }

    async fn evaluate(&self, script: &str) -> parasuite_common::Result<()> {
        Ok(self.run(script.to_string(), true).await?)
    }

    async fn close(&self) -> parasuite_common::Result<()> {
        Ok(self.shutdown()?)
    }

    fn describe(&self) -> String {
        format!("playwright:{}:{}", self.launch.browser.as_str(), self.label)
    }
}

/// Opens [`PlaywrightSession`]s
pub struct PlaywrightFactory {
    config: PlaywrightConfig,
    opened: AtomicUsize,
}

impl PlaywrightFactory {
    /// Create a factory after checking that Playwright is installed
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        info!("Playwright found, sessions will run via {}", config.node_binary);
        Ok(Self::unchecked(config))
    }

    /// Create a factory without probing the Playwright installation
    pub fn unchecked(config: PlaywrightConfig) -> Self {
        Self {
            config,
            opened: AtomicUsize::new(0),
        }
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn open_session(&self, session: &SessionConfig) -> E2eResult<PlaywrightSession> {
        let n = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::fs::create_dir_all(&self.config.scratch_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("session-{}-", n))
            .tempdir_in(&self.config.scratch_dir)?;

        Ok(PlaywrightSession {
            label: format!("session-{}", n),
            launch: LaunchOptions::new(&self.config, session),
            node_binary: self.config.node_binary.clone(),
            node_path: self.config.node_path.clone(),
            scratch: Mutex::new(Some(scratch)),
            history: Mutex::new(Vec::new()),
            ops: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SessionFactory for PlaywrightFactory {
    async fn open(&self, config: &SessionConfig) -> parasuite_common::Result<SessionRef> {
        let session = self.open_session(config).await?;
        Ok(std::sync::Arc::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::AttributeAssertion;
    use tempfile::TempDir;
    use test_case::test_case;

    fn launch(maximized: bool) -> LaunchOptions {
        LaunchOptions {
            browser: BrowserKind::Firefox,
            headless: true,
            viewport_width: 1024,
            viewport_height: 768,
            maximized,
            implicit_wait_ms: 2500,
            base_url: "http://localhost:3000".to_string(),
        }
    }

    #[test]
    fn test_build_script_launch_options() {
        let script = build_script(&launch(false), &[navigate_js("/login")]);

        assert!(script.contains("await firefox.launch({ headless: true, args: [] })"));
        assert!(script.contains("viewport: { width: 1024, height: 768 }"));
        assert!(script.contains("page.setDefaultTimeout(2500);"));
        assert!(script.contains("const baseUrl = \"http://localhost:3000\";"));
        assert!(script.contains("new URL(\"/login\", baseUrl)"));
        assert!(script.contains("await browser.close();"));
    }

    #[test]
    fn test_build_script_maximized() {
        let script = build_script(&launch(true), &[]);
        assert!(script.contains("args: ['--start-maximized']"));
        assert!(script.contains("viewport: null"));
    }

    #[test_case(
        TestStep::Click { selector: "#buy".into(), timeout_ms: None },
        "await page.click(\"#buy\", { timeout: 5000 });" ; "click")]
    #[test_case(
        TestStep::Fill { selector: "input[name='q']".into(), value: "it's".into(), clear_first: false },
        "await page.fill(\"input[name='q']\", \"it's\");" ; "fill escapes quotes")]
    #[test_case(
        TestStep::Press { selector: None, key: "Enter".into() },
        "await page.keyboard.press(\"Enter\");" ; "press")]
    #[test_case(
        TestStep::Wait { selector: ".done".into(), timeout_ms: 100, state: WaitState::Hidden },
        "await page.waitForSelector(\".done\", { state: 'hidden', timeout: 100 });" ; "wait")]
    fn test_step_to_js(step: TestStep, expected: &str) {
        assert_eq!(step_to_js(&step, 0).unwrap().trim(), expected);
    }

    #[test]
    fn test_assert_attribute_contains() {
        let step = TestStep::Assert {
            selector: "a.next".into(),
            visible: Some(true),
            text: None,
            text_contains: None,
            attribute: Some(AttributeAssertion {
                name: "href".into(),
                value: None,
                contains: Some("page=2".into()),
            }),
            count: None,
        };
        let js = step_to_js(&step, 3).unwrap();
        assert!(js.contains("toBeVisible()"));
        assert!(js.contains("toHaveAttribute(\"href\", new RegExp(\"page=2\"))"));
    }

    #[test]
    fn test_evaluate_with_expected_value() {
        let step = TestStep::Evaluate {
            script: "return document.title".into(),
            expected: Some(serde_json::json!("Checkout")),
        };
        let js = step_to_js(&step, 7).unwrap();
        assert!(js.contains("const result_7 = await page.evaluate"));
        assert!(js.contains("JSON.stringify(result_7) !== \"\\\"Checkout\\\"\""));
    }

    #[test]
    fn test_local_steps_have_no_script() {
        assert!(step_to_js(&TestStep::Sleep { ms: 5 }, 0).is_none());
        assert!(step_to_js(&TestStep::Log { message: "x".into() }, 0).is_none());
    }

    #[test]
    fn test_failure_message_prefers_script_error() {
        let stderr = "node warning\n{\"success\":false,\"error\":\"Timeout 5000ms exceeded\"}\n";
        assert_eq!(failure_message("", stderr), "Timeout 5000ms exceeded");
        assert!(failure_message("out", "segfault").contains("segfault"));
    }

    #[tokio::test]
    async fn test_closed_session_rejects_operations() {
        let tmp = TempDir::new().unwrap();
        let factory = PlaywrightFactory::unchecked(PlaywrightConfig {
            scratch_dir: tmp.path().join("sessions"),
            ..PlaywrightConfig::default()
        });

        let session = factory.open(&SessionConfig::default()).await.unwrap();
        assert!(session.describe().starts_with("playwright:chromium:session-1"));
        session.close().await.unwrap();

        let err = session.navigate("/").await.unwrap_err();
        assert!(err.to_string().contains("closed"));
        assert!(session.close().await.is_err());
        assert_eq!(
            std::fs::read_dir(tmp.path().join("sessions")).unwrap().count(),
            0
        );
    }
}
