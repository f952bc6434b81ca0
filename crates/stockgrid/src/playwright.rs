//! Playwright browser automation
//!
//! `PlaywrightDriver` keeps one Node process alive for the whole session. The
//! process runs a small bridge script that owns the browser page and accepts
//! newline-delimited JSON commands on stdin. Commands are handled
//! concurrently and answered by id on stdout, so a click and the wait for the
//! loader it triggers really do run at the same time.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use crate::error::{GridError, GridResult};
use crate::locator::Locator;
use crate::page::PageDriver;

/// Extra time granted on top of a command's own timeout before the bridge
/// is considered unresponsive
const REPLY_SLACK: Duration = Duration::from_secs(5);

/// Polling period for attribute waits inside the bridge, unless overridden
const DEFAULT_ATTRIBUTE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(GridError::Config(format!("unknown browser {:?}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Node executable used to run the bridge
    pub node_binary: String,

    /// `node_modules` directory holding `playwright`; defaults to the one in
    /// the working directory
    pub node_modules: Option<PathBuf>,

    /// How long to wait for the browser to come up
    pub launch_timeout_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_binary: "node".to_string(),
            node_modules: None,
            launch_timeout_ms: 30_000,
        }
    }
}

/// A command sent to the bridge
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeOp<'a> {
    Goto { url: &'a str, timeout: u64 },
    Reload { timeout: u64 },
    Click { selector: &'a str, timeout: u64 },
    Type { selector: &'a str, text: &'a str, timeout: u64 },
    Fill { selector: &'a str, value: &'a str, timeout: u64 },
    Text { selector: &'a str, timeout: u64 },
    Count { selector: &'a str },
    Attribute { selector: &'a str, name: &'a str, timeout: u64 },
    WaitFor { selector: &'a str, state: &'static str, timeout: u64 },
    WaitForAttribute { selector: &'a str, name: &'a str, value: &'a str, timeout: u64, poll: u64 },
    Close,
}

impl BridgeOp<'_> {
    fn timeout_ms(&self) -> Option<u64> {
        match self {
            BridgeOp::Goto { timeout, .. }
            | BridgeOp::Reload { timeout }
            | BridgeOp::Click { timeout, .. }
            | BridgeOp::Type { timeout, .. }
            | BridgeOp::Fill { timeout, .. }
            | BridgeOp::Text { timeout, .. }
            | BridgeOp::Attribute { timeout, .. }
            | BridgeOp::WaitFor { timeout, .. }
            | BridgeOp::WaitForAttribute { timeout, .. } => Some(*timeout),
            _ => None,
        }
    }

    fn selector(&self) -> &str {
        match self {
            BridgeOp::Click { selector, .. }
            | BridgeOp::Type { selector, .. }
            | BridgeOp::Fill { selector, .. }
            | BridgeOp::Text { selector, .. }
            | BridgeOp::Count { selector }
            | BridgeOp::Attribute { selector, .. }
            | BridgeOp::WaitFor { selector, .. }
            | BridgeOp::WaitForAttribute { selector, .. } => selector,
            BridgeOp::Goto { url, .. } => url,
            BridgeOp::Reload { .. } | BridgeOp::Close => "page",
        }
    }

    fn condition(&self) -> String {
        match self {
            BridgeOp::WaitFor { state, .. } => state.to_string(),
            BridgeOp::WaitForAttribute { name, value, .. } => format!("{}={}", name, value),
            BridgeOp::Text { .. } | BridgeOp::Attribute { .. } => "attached".to_string(),
            BridgeOp::Goto { .. } | BridgeOp::Reload { .. } => "loaded".to_string(),
            _ => "actionable".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    #[serde(flatten)]
    op: BridgeOp<'a>,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<BridgeReply>>>>;

/// Browser driven through a long-lived Playwright bridge process
pub struct PlaywrightDriver {
    stdin: AsyncMutex<ChildStdin>,
    child: Mutex<Child>,
    pending: Pending,
    next_id: AtomicU64,
    attribute_poll: Duration,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Start the browser and wait until the bridge reports ready
    pub async fn launch(config: &PlaywrightConfig) -> GridResult<Self> {
        Self::check_playwright_installed().await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, build_bridge_script(config))?;

        let node_modules = match &config.node_modules {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?.join("node_modules"),
        };

        info!(
            "Launching {} (headless: {}) via {}",
            config.browser.as_str(),
            config.headless,
            script_path.display()
        );

        let mut child = Command::new(&config.node_binary)
            .arg(&script_path)
            .env("NODE_PATH", &node_modules)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GridError::Driver("bridge stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GridError::Driver("bridge stdout not captured".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[bridge] {}", line);
                }
            });
        }

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (ready_tx, ready_rx) = oneshot::channel();
        pending.lock().insert(0, ready_tx);

        let dispatch = pending.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<BridgeReply>(&line) {
                    Ok(reply) => {
                        if let Some(tx) = dispatch.lock().remove(&reply.id) {
                            let _ = tx.send(reply);
                        }
                    }
                    Err(_) => debug!("[bridge] {}", line),
                }
            }
            debug!("bridge stdout closed");
            dispatch.lock().clear();
        });

        let launch_timeout = Duration::from_millis(config.launch_timeout_ms);
        match tokio::time::timeout(launch_timeout, ready_rx).await {
            Ok(Ok(reply)) if reply.ok => {}
            Ok(Ok(reply)) => {
                return Err(GridError::Driver(format!(
                    "browser failed to start: {}",
                    reply.error.unwrap_or_default()
                )))
            }
            Ok(Err(_)) => return Err(GridError::Driver("bridge exited during startup".into())),
            Err(_) => {
                return Err(GridError::timeout("browser", "ready", config.launch_timeout_ms))
            }
        }

        Ok(Self {
            stdin: AsyncMutex::new(stdin),
            child: Mutex::new(child),
            pending,
            next_id: AtomicU64::new(1),
            attribute_poll: DEFAULT_ATTRIBUTE_POLL,
            _script_dir: script_dir,
        })
    }

    /// Set how often the bridge re-reads an attribute it is waiting on
    pub fn with_attribute_poll(mut self, poll: Duration) -> Self {
        self.attribute_poll = poll;
        self
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed() -> GridResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(GridError::PlaywrightNotFound),
        }
    }

    async fn request(&self, op: BridgeOp<'_>) -> GridResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let budget = op
            .timeout_ms()
            .map(|ms| Duration::from_millis(ms) + REPLY_SLACK)
            .unwrap_or(Duration::from_secs(60));
        let selector = op.selector().to_string();
        let condition = op.condition();

        let mut line = serde_json::to_string(&BridgeRequest { id, op })?;
        line.push('\n');
        if let Err(e) = self.send(&line).await {
            self.pending.lock().remove(&id);
            return Err(e);
        }

        let reply = match tokio::time::timeout(budget, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(GridError::Driver("bridge exited".into())),
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(GridError::timeout(selector, condition, budget.as_millis() as u64));
            }
        };

        if reply.ok {
            Ok(reply.value)
        } else if reply.timeout {
            Err(GridError::SyncTimeout {
                locator: selector,
                condition,
                waited_ms: budget.saturating_sub(REPLY_SLACK).as_millis() as u64,
            })
        } else {
            Err(GridError::Driver(reply.error.unwrap_or_else(|| "unknown bridge error".into())))
        }
    }

    async fn send(&self, line: &str) -> GridResult<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Close the browser and wait for the bridge to exit
    pub async fn close(self) -> GridResult<()> {
        self.request(BridgeOp::Close).await.map(|_| ()).map_err(|e| {
            warn!("bridge did not close cleanly: {}", e);
            e
        })
    }
}

impl Drop for PlaywrightDriver {
    fn drop(&mut self) {
        let mut child = self.child.lock();

        // Give node a chance to close the browser first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        let _ = child.start_kill();
    }
}

fn ms(timeout: Duration) -> u64 {
    timeout.as_millis() as u64
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn goto(&self, url: &str, timeout: Duration) -> GridResult<()> {
        self.request(BridgeOp::Goto { url, timeout: ms(timeout) }).await.map(|_| ())
    }

    async fn reload(&self, timeout: Duration) -> GridResult<()> {
        self.request(BridgeOp::Reload { timeout: ms(timeout) }).await.map(|_| ())
    }

    async fn click(&self, locator: &Locator, timeout: Duration) -> GridResult<()> {
        self.request(BridgeOp::Click { selector: locator.as_str(), timeout: ms(timeout) })
            .await
            .map(|_| ())
    }

    async fn type_text(&self, locator: &Locator, text: &str, timeout: Duration) -> GridResult<()> {
        self.request(BridgeOp::Type { selector: locator.as_str(), text, timeout: ms(timeout) })
            .await
            .map(|_| ())
    }

    async fn set_value(&self, locator: &Locator, value: &str, timeout: Duration) -> GridResult<()> {
        self.request(BridgeOp::Fill { selector: locator.as_str(), value, timeout: ms(timeout) })
            .await
            .map(|_| ())
    }

    async fn read_text(&self, locator: &Locator, timeout: Duration) -> GridResult<String> {
        let value = self
            .request(BridgeOp::Text { selector: locator.as_str(), timeout: ms(timeout) })
            .await?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    async fn count(&self, locator: &Locator) -> GridResult<usize> {
        let value = self.request(BridgeOp::Count { selector: locator.as_str() }).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| GridError::Driver(format!("count of {} was not a number: {}", locator, value)))
    }

    async fn attribute(&self, locator: &Locator, name: &str, timeout: Duration) -> GridResult<Option<String>> {
        let value = self
            .request(BridgeOp::Attribute { selector: locator.as_str(), name, timeout: ms(timeout) })
            .await?;
        Ok(value.as_str().map(String::from))
    }

    async fn wait_for_visible(&self, locator: &Locator, timeout: Duration) -> GridResult<()> {
        self.request(BridgeOp::WaitFor { selector: locator.as_str(), state: "visible", timeout: ms(timeout) })
            .await
            .map(|_| ())
    }

    async fn wait_for_hidden(&self, locator: &Locator, timeout: Duration) -> GridResult<()> {
        self.request(BridgeOp::WaitFor { selector: locator.as_str(), state: "hidden", timeout: ms(timeout) })
            .await
            .map(|_| ())
    }

    async fn wait_for_attribute_equals(
        &self,
        locator: &Locator,
        name: &str,
        value: &str,
        timeout: Duration,
    ) -> GridResult<()> {
        self.request(BridgeOp::WaitForAttribute {
            selector: locator.as_str(),
            name,
            value,
            timeout: ms(timeout),
            poll: ms(self.attribute_poll),
        })
        .await
        .map(|_| ())
    }
}

/// Build the bridge script run by `node`
fn build_bridge_script(config: &PlaywrightConfig) -> String {
    let mut script = format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {{
  let browser;
  try {{
    browser = await {browser}.launch({{ headless: {headless} }});
  }} catch (error) {{
    reply({{ id: 0, ok: false, error: error.message }});
    process.exit(1);
  }}
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
    );

    script.push_str(
        r#"
  const first = (selector) => page.locator(selector).first();
  const handlers = {
    goto: async (c) => { await page.goto(c.url, { waitUntil: 'load', timeout: c.timeout }); return null; },
    reload: async (c) => { await page.reload({ waitUntil: 'load', timeout: c.timeout }); return null; },
    click: async (c) => { await first(c.selector).click({ timeout: c.timeout }); return null; },
    type: async (c) => { await first(c.selector).pressSequentially(c.text, { timeout: c.timeout }); return null; },
    fill: async (c) => { await first(c.selector).fill(c.value, { timeout: c.timeout }); return null; },
    text: async (c) => ((await first(c.selector).textContent({ timeout: c.timeout })) || '').trim(),
    count: async (c) => page.locator(c.selector).count(),
    attribute: async (c) => first(c.selector).getAttribute(c.name, { timeout: c.timeout }),
    wait_for: async (c) => { await first(c.selector).waitFor({ state: c.state, timeout: c.timeout }); return null; },
    wait_for_attribute: async (c) => {
      const deadline = Date.now() + c.timeout;
      for (;;) {
        const remaining = Math.max(1, deadline - Date.now());
        const current = await first(c.selector).getAttribute(c.name, { timeout: remaining });
        if (current === c.value) return null;
        if (Date.now() >= deadline) {
          const error = new Error(`${c.selector} ${c.name}=${current}, expected ${c.value}`);
          error.name = 'TimeoutError';
          throw error;
        }
        await page.waitForTimeout(c.poll);
      }
    },
  };

  const input = readline.createInterface({ input: process.stdin });
  input.on('line', (line) => {
    let command;
    try {
      command = JSON.parse(line);
    } catch (error) {
      console.error(`unparseable command: ${line}`);
      return;
    }
    if (command.op === 'close') {
      browser.close().finally(() => {
        reply({ id: command.id, ok: true, value: null });
        process.exit(0);
      });
      return;
    }
    const handler = handlers[command.op];
    if (!handler) {
      reply({ id: command.id, ok: false, error: `unknown op ${command.op}` });
      return;
    }
    handler(command).then(
      (value) => reply({ id: command.id, ok: true, value: value === undefined ? null : value }),
      (error) => reply({ id: command.id, ok: false, error: error.message, timeout: error.name === 'TimeoutError' }),
    );
  });
  input.on('close', () => browser.close().finally(() => process.exit(0)));

  reply({ id: 0, ok: true, value: 'ready' });
})();
"#,
    );

    script
}
