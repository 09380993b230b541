//! Desktop vs. handheld classification of a client environment.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Narrowest viewport still treated as a desktop.
pub const DESKTOP_MIN_WIDTH: u32 = 1024;

const MOBILE_UA_TOKENS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "bb10",
    "iemobile",
    "opera mini",
    "windows phone",
    "kindle",
    "silk",
    "mobile",
    "tablet",
];

/// What the browser reports about the display it runs on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEnvironment {
    pub has_touch_events: bool,
    pub max_touch_points: u32,
    pub viewport_width: u32,
    pub user_agent: String,
}

impl ClientEnvironment {
    pub fn has_touch(&self) -> bool {
        self.has_touch_events || self.max_touch_points > 0
    }
}

pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_UA_TOKENS.iter().any(|token| ua.contains(token))
}

/// `None` means there is no display to look at (server-side evaluation).
///
/// Touch support is ignored: touch laptops are desktops.
pub fn is_desktop(env: Option<&ClientEnvironment>) -> bool {
    let Some(env) = env else {
        return false;
    };
    env.viewport_width >= DESKTOP_MIN_WIDTH && !is_mobile_user_agent(&env.user_agent)
}

/// Keeps a desktop/handheld flag in sync with a stream of environment
/// snapshots (one per viewport resize).
///
/// Observation stops when the watch is dropped.
pub struct DesktopWatch {
    current: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl DesktopWatch {
    pub fn spawn(mut env: watch::Receiver<Option<ClientEnvironment>>) -> Self {
        let initial = is_desktop(env.borrow_and_update().as_ref());
        let (tx, current) = watch::channel(initial);

        let task = tokio::spawn(async move {
            while env.changed().await.is_ok() {
                let desktop = is_desktop(env.borrow_and_update().as_ref());
                tx.send_if_modified(|cur| {
                    if *cur == desktop {
                        return false;
                    }
                    *cur = desktop;
                    true
                });
            }
        });

        Self { current, task }
    }

    pub fn is_desktop(&self) -> bool {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.current.clone()
    }
}

impl Drop for DesktopWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
