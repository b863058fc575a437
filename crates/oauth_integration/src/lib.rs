use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::debug;

pub const FEDERATED_ACCOUNT_EMAIL: &str = "google.user@gmail.com";
pub const CONSENT_WINDOW_NAME: &str = "google-oauth";
pub const CONSENT_WINDOW_WIDTH: u32 = 500;
pub const CONSENT_WINDOW_HEIGHT: u32 = 600;

/// Screen rectangle of the window that opens the consent popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentWindowOptions {
    pub name: String,
    pub title: String,
    pub client_name: String,
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl ConsentWindowOptions {
    /// Consent popup centered over `parent`.
    pub fn centered(parent: Viewport, client_name: impl Into<String>) -> Self {
        let left = parent.x + (parent.width as i32 - CONSENT_WINDOW_WIDTH as i32) / 2;
        let top = parent.y + (parent.height as i32 - CONSENT_WINDOW_HEIGHT as i32) / 2;
        Self {
            name: CONSENT_WINDOW_NAME.to_string(),
            title: "Sign in - Google Accounts".to_string(),
            client_name: client_name.into(),
            width: CONSENT_WINDOW_WIDTH,
            height: CONSENT_WINDOW_HEIGHT,
            left,
            top,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountChoice {
    pub email: String,
    pub label: String,
}

impl AccountChoice {
    pub fn federated_default() -> Self {
        Self {
            email: FEDERATED_ACCOUNT_EMAIL.to_string(),
            label: "Google Account".to_string(),
        }
    }
}

#[async_trait]
pub trait ConsentWindow: Send + Sync {
    fn accounts(&self) -> Vec<AccountChoice>;
    fn is_closed(&self) -> bool;
    /// Account picked before the window closed, if any.
    fn chosen_account(&self) -> Option<AccountChoice>;

    /// True only when the provider reported an explicit refusal. A window
    /// that is simply closed is not a denial.
    fn denied(&self) -> bool {
        false
    }

    /// Resolves once the window is closed. The default polls `is_closed`.
    async fn wait_closed(&self, poll_interval: Duration) {
        while !self.is_closed() {
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[async_trait]
pub trait ConsentLauncher: Send + Sync {
    /// Opens a consent window. `Ok(None)` means the popup was blocked.
    async fn open(
        &self,
        options: ConsentWindowOptions,
    ) -> anyhow::Result<Option<Arc<dyn ConsentWindow>>>;
}

#[derive(Debug, Clone, Default)]
struct WindowState {
    closed: bool,
    denied: bool,
    chosen: Option<AccountChoice>,
}

/// In-process stand-in for the provider's account picker.
pub struct SimulatedConsentWindow {
    options: ConsentWindowOptions,
    accounts: Vec<AccountChoice>,
    state: watch::Sender<WindowState>,
}

impl SimulatedConsentWindow {
    pub fn new(options: ConsentWindowOptions) -> Self {
        let (state, _) = watch::channel(WindowState::default());
        Self {
            options,
            accounts: vec![AccountChoice::federated_default()],
            state,
        }
    }

    pub fn options(&self) -> &ConsentWindowOptions {
        &self.options
    }

    /// Picks the account at `index` and closes the window, like clicking it.
    /// Returns false when the index is unknown or the window is already closed.
    pub fn choose(&self, index: usize) -> bool {
        let Some(account) = self.accounts.get(index).cloned() else {
            return false;
        };
        self.state.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.chosen = Some(account);
            state.closed = true;
            true
        })
    }

    /// Closes the window without picking an account.
    pub fn dismiss(&self) {
        self.state.send_modify(|state| state.closed = true);
    }

    /// Closes the window with an explicit refusal from the provider.
    pub fn deny(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.closed {
                return false;
            }
            state.denied = true;
            state.closed = true;
            true
        })
    }
}

#[async_trait]
impl ConsentWindow for SimulatedConsentWindow {
    fn accounts(&self) -> Vec<AccountChoice> {
        self.accounts.clone()
    }

    fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    fn chosen_account(&self) -> Option<AccountChoice> {
        self.state.borrow().chosen.clone()
    }

    fn denied(&self) -> bool {
        self.state.borrow().denied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedConsent {
    /// The user picks the only account after `after`.
    Choose { after: Duration },
    /// The user closes the window without choosing after `after`.
    Dismiss { after: Duration },
    /// The provider refuses consent after `after`.
    Deny { after: Duration },
    /// The user never acts; the caller drives the window.
    Manual,
    /// The popup is blocked.
    Blocked,
}

pub struct SimulatedConsentLauncher {
    behaviour: SimulatedConsent,
    last_window: Mutex<Option<Arc<SimulatedConsentWindow>>>,
}

impl SimulatedConsentLauncher {
    pub fn new(behaviour: SimulatedConsent) -> Self {
        Self {
            behaviour,
            last_window: Mutex::new(None),
        }
    }

    pub async fn last_window(&self) -> Option<Arc<SimulatedConsentWindow>> {
        self.last_window.lock().await.clone()
    }
}

#[async_trait]
impl ConsentLauncher for SimulatedConsentLauncher {
    async fn open(
        &self,
        options: ConsentWindowOptions,
    ) -> anyhow::Result<Option<Arc<dyn ConsentWindow>>> {
        if self.behaviour == SimulatedConsent::Blocked {
            debug!(name = %options.name, "consent popup blocked");
            return Ok(None);
        }

        debug!(
            name = %options.name,
            left = options.left,
            top = options.top,
            "opening consent popup"
        );
        let window = Arc::new(SimulatedConsentWindow::new(options));
        *self.last_window.lock().await = Some(Arc::clone(&window));

        match self.behaviour {
            SimulatedConsent::Choose { after } => {
                let window = Arc::clone(&window);
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    window.choose(0);
                });
            }
            SimulatedConsent::Dismiss { after } => {
                let window = Arc::clone(&window);
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    window.dismiss();
                });
            }
            SimulatedConsent::Deny { after } => {
                let window = Arc::clone(&window);
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    window.deny();
                });
            }
            SimulatedConsent::Manual | SimulatedConsent::Blocked => {}
        }

        let window: Arc<dyn ConsentWindow> = window;
        Ok(Some(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_window_is_centered_on_parent() {
        let options = ConsentWindowOptions::centered(
            Viewport {
                x: 100,
                y: 50,
                width: 1500,
                height: 1000,
            },
            "Vibe",
        );
        assert_eq!(options.left, 100 + 500);
        assert_eq!(options.top, 50 + 200);
        assert_eq!(options.name, CONSENT_WINDOW_NAME);
    }

    #[test]
    fn simulated_window_offers_exactly_one_account() {
        let window = SimulatedConsentWindow::new(ConsentWindowOptions::centered(
            Viewport::default(),
            "Vibe",
        ));
        assert_eq!(window.accounts(), vec![AccountChoice::federated_default()]);
        assert!(!window.choose(1));
        assert!(!window.is_closed());

        assert!(window.choose(0));
        assert!(window.is_closed());
        assert_eq!(
            window.chosen_account().map(|a| a.email),
            Some(FEDERATED_ACCOUNT_EMAIL.to_string())
        );
    }

    #[test]
    fn dismissed_window_has_no_choice() {
        let window = SimulatedConsentWindow::new(ConsentWindowOptions::centered(
            Viewport::default(),
            "Vibe",
        ));
        window.dismiss();
        assert!(window.is_closed());
        assert!(window.chosen_account().is_none());
        assert!(!window.denied());
        assert!(!window.choose(0));
        assert!(!window.deny());
        assert!(window.chosen_account().is_none());
    }

    #[test]
    fn denial_is_only_reported_when_signalled() {
        let window = SimulatedConsentWindow::new(ConsentWindowOptions::centered(
            Viewport::default(),
            "Vibe",
        ));
        assert!(window.deny());
        assert!(window.is_closed());
        assert!(window.denied());
        assert!(window.chosen_account().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn launcher_choose_closes_after_delay() {
        let launcher = SimulatedConsentLauncher::new(SimulatedConsent::Choose {
            after: Duration::from_millis(1200),
        });
        let window = launcher
            .open(ConsentWindowOptions::centered(Viewport::default(), "Vibe"))
            .await
            .expect("open")
            .expect("not blocked");

        let started = tokio::time::Instant::now();
        window.wait_closed(Duration::from_millis(500)).await;
        // Polling at 500ms observes the 1200ms close on the 1500ms tick.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(2000), "{elapsed:?}");
        assert!(window.chosen_account().is_some());
        assert!(launcher.last_window().await.is_some());
    }

    #[tokio::test]
    async fn blocked_launcher_returns_none() {
        let launcher = SimulatedConsentLauncher::new(SimulatedConsent::Blocked);
        let window = launcher
            .open(ConsentWindowOptions::centered(Viewport::default(), "Vibe"))
            .await
            .expect("open");
        assert!(window.is_none());
        assert!(launcher.last_window().await.is_none());
    }
}
