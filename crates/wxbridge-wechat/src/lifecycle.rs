// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Login, registration and startup reconnection of WeChat accounts.
//!
//! A login is either a fresh QR-code login or a resume from the credential
//! blob persisted at the last successful login. Either way the session is
//! awaited until it reports `login` or `logout`; there is no timeout.
//!
//! On success the account is registered, its id is added to the persisted id
//! list, credentials are written back, and an inbound task starts feeding the
//! account's session events through the normalizer onto the bus. Messages
//! arriving within the grace period after login are dropped so the backlog
//! replayed by the provider is not published.
//!
//! [`SessionManager::connect`] never propagates a failure: errors and panics
//! inside a login attempt are logged and turned into `None`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wxbridge_config::AccountStore;
use wxbridge_config::model::WeChatConfig;
use wxbridge_core::ids::account_id;
use wxbridge_core::protocol::SessionEvent;
use wxbridge_core::types::{Account, Segment};
use wxbridge_core::{BridgeError, BusEvent, EventBus, SessionClient, SessionFactory, publish_scoped};

use crate::credentials::CredentialStore;
use crate::errlog::ErrorLog;
use crate::media::MediaFetcher;
use crate::registry::{AccountHandle, AccountRegistry};

/// Base of the QR code image URL; the login uuid is appended.
pub const QR_URL_BASE: &str = "https://login.weixin.qq.com/qrcode/";

/// Receives the QR prompt of a fresh login.
pub type QrSink = Arc<dyn Fn(Vec<Segment>) + Send + Sync>;

/// How [`SessionManager::connect`] obtains a session.
#[derive(Clone)]
pub enum LoginMode {
    /// Fresh login; the QR prompt goes to the sink.
    Qr(QrSink),
    /// Resume the account with this id from its credential file.
    Resume(String),
}

impl LoginMode {
    fn label(&self) -> &str {
        match self {
            Self::Qr(_) => "qr",
            Self::Resume(id) => id,
        }
    }
}

impl std::fmt::Debug for LoginMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Qr(_) => f.write_str("Qr(..)"),
            Self::Resume(id) => f.debug_tuple("Resume").field(id).finish(),
        }
    }
}

/// The QR image URL for a login uuid.
pub fn qr_url(uuid: &str) -> String {
    format!("{QR_URL_BASE}{uuid}")
}

/// The prompt delivered to a [`QrSink`].
pub fn qr_prompt(url: &str) -> Vec<Segment> {
    vec![
        Segment::text(format!("Scan the QR code with WeChat to log in: {url}")),
        Segment::image_url(url),
    ]
}

fn connection(message: impl Into<String>) -> BridgeError {
    BridgeError::Connection {
        message: message.into(),
        source: None,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A running inbound task and the token that stops it.
struct InboundTask {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Owns every account session of the process.
pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
    bus: Arc<dyn EventBus>,
    registry: Arc<AccountRegistry>,
    store: Arc<AccountStore>,
    credentials: CredentialStore,
    errors: Arc<ErrorLog>,
    fetcher: MediaFetcher,
    grace: Duration,
    cancel: CancellationToken,
    /// One inbound task per account id.
    tasks: Mutex<HashMap<String, InboundTask>>,
}

impl SessionManager {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        bus: Arc<dyn EventBus>,
        store: Arc<AccountStore>,
        config: &WeChatConfig,
    ) -> Self {
        Self {
            factory,
            bus,
            registry: Arc::new(AccountRegistry::new()),
            store,
            credentials: CredentialStore::new(&config.data_dir),
            errors: Arc::new(ErrorLog::new(Duration::from_secs(
                config.error_suppression_secs,
            ))),
            fetcher: MediaFetcher::default(),
            grace: Duration::from_millis(config.message_grace_ms),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Uses `fetcher` for outbound file payloads.
    pub fn with_fetcher(mut self, fetcher: MediaFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn registry(&self) -> &Arc<AccountRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn errors(&self) -> &Arc<ErrorLog> {
        &self.errors
    }

    /// Logs in and registers one account. Returns its id, or `None` on failure.
    pub async fn connect(&self, mode: LoginMode) -> Option<String> {
        let label = mode.label().to_string();
        match AssertUnwindSafe(self.try_connect(mode)).catch_unwind().await {
            Ok(Ok(id)) => Some(id),
            Ok(Err(e)) => {
                error!(login = %label, error = %e, "account connection failed");
                None
            }
            Err(payload) => {
                error!(
                    login = %label,
                    "login attempt panicked: {}",
                    panic_message(payload.as_ref())
                );
                None
            }
        }
    }

    async fn try_connect(&self, mode: LoginMode) -> Result<String, BridgeError> {
        let session = match mode {
            LoginMode::Qr(sink) => self.qr_login(&sink).await?,
            LoginMode::Resume(id) => self.resume_login(&id).await?,
        };
        self.register(session).await
    }

    /// Fresh login through a QR code.
    pub async fn qr_login(&self, sink: &QrSink) -> Result<Arc<dyn SessionClient>, BridgeError> {
        let session = self.factory.create();
        let events = session.subscribe();
        session.start().await?;
        self.wait_for_login(events, Some(sink), None).await?;
        Ok(session)
    }

    /// Resumes `id` from its credential file.
    ///
    /// Fails without creating a session when no file exists.
    pub async fn resume_login(&self, id: &str) -> Result<Arc<dyn SessionClient>, BridgeError> {
        let Some(blob) = self.credentials.load(id).await? else {
            return Err(connection(format!(
                "no credentials at {}",
                self.credentials.path_for(id).display()
            )));
        };
        let session = self.factory.restore(blob)?;
        let events = session.subscribe();
        session.restart().await?;
        self.wait_for_login(events, None, Some(id)).await?;
        Ok(session)
    }

    async fn wait_for_login(
        &self,
        mut events: broadcast::Receiver<SessionEvent>,
        sink: Option<&QrSink>,
        account: Option<&str>,
    ) -> Result<(), BridgeError> {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Login) => return Ok(()),
                Ok(SessionEvent::Logout) => {
                    return Err(connection("session logged out before login completed"));
                }
                Ok(SessionEvent::Uuid(uuid)) => {
                    let url = qr_url(&uuid);
                    info!(url = %url, "scan QR code to log in");
                    if let Some(sink) = sink {
                        sink(qr_prompt(&url));
                    }
                }
                Ok(SessionEvent::Error(err)) => {
                    self.errors.report(&err, account);
                }
                Ok(SessionEvent::Message(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "login event stream lagged");
                }
                Err(RecvError::Closed) => {
                    return Err(connection("session event stream closed during login"));
                }
            }
        }
    }

    async fn register(&self, session: Arc<dyn SessionClient>) -> Result<String, BridgeError> {
        let user = session
            .user()
            .filter(|user| user.uin != 0)
            .ok_or_else(|| connection("login completed without an authenticated user"))?;
        let id = account_id(user.uin);

        let credentials = session.credentials();
        if let Err(e) = self.credentials.save(&id, &credentials).await {
            error!(self_id = %id, error = %e, "failed to persist credentials");
        }

        let origin = session.constants().origin;
        let account = Account {
            id: id.clone(),
            user_name: user.user_name,
            nickname: user.nick_name,
            avatar: format!("{origin}{}", user.head_img_url),
            start_time: chrono::Utc::now(),
            credentials,
        };
        let handle = Arc::new(AccountHandle::new(account, session, self.fetcher.clone()));
        if self.registry.insert(handle.clone()).is_some() {
            info!(self_id = %id, "replaced previous session");
        }

        if let Err(e) = self.store.add_id(&id).await {
            error!(self_id = %id, error = %e, "failed to save account store");
        }

        self.spawn_inbound(handle.clone());

        info!(
            self_id = %id,
            nickname = %handle.account().nickname,
            "WeChat account connected"
        );
        publish_scoped(
            self.bus.as_ref(),
            "connect",
            &id,
            BusEvent::Connect(handle.account().clone()),
        )
        .await;
        Ok(id)
    }

    /// Starts the inbound task for `handle`, stopping any task left over from
    /// an earlier session of the same account.
    fn spawn_inbound(&self, handle: Arc<AccountHandle>) {
        let id = handle.id().to_string();
        let mut events = handle.session().subscribe();
        let bus = self.bus.clone();
        let errors = self.errors.clone();
        let store = self.store.clone();
        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        let ready_at = Instant::now() + self.grace;

        let task = tokio::spawn(async move {
            let self_id = handle.id().to_string();
            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(SessionEvent::Message(raw)) => {
                        if Instant::now() < ready_at {
                            debug!(self_id = %self_id, msg_id = %raw.msg_id, "message within login grace period, dropped");
                            continue;
                        }
                        let expire_time = store.expire_time().await;
                        let now = chrono::Utc::now().timestamp();
                        let Some(message) = handle.normalizer().normalize(&raw, expire_time, now)
                        else {
                            continue;
                        };
                        let base = message.post_type.to_string();
                        let scope = message.message_type.to_string();
                        publish_scoped(bus.as_ref(), &base, &scope, BusEvent::Message(Arc::new(message)))
                            .await;
                    }
                    Ok(SessionEvent::Error(err)) => {
                        errors.report(&err, Some(&self_id));
                    }
                    Ok(SessionEvent::Logout) => {
                        warn!(self_id = %self_id, "session logged out");
                    }
                    Ok(SessionEvent::Login | SessionEvent::Uuid(_)) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(self_id = %self_id, skipped, "inbound event stream lagged");
                    }
                    Err(RecvError::Closed) => {
                        info!(self_id = %self_id, "session event stream closed");
                        break;
                    }
                }
            }
            debug!(self_id = %self_id, "inbound task stopped");
        });
        let previous = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id,
                InboundTask {
                    cancel: task_cancel,
                    join: task,
                },
            );
        if let Some(previous) = previous {
            previous.cancel.cancel();
            debug!("stopped inbound task of replaced session");
        }
    }

    /// Reconnects every persisted account, one at a time.
    ///
    /// Returns the number of accounts that came online.
    pub async fn load(&self) -> usize {
        if let Err(e) = self.credentials.ensure_dir().await {
            error!(error = %e, "failed to create credential directory");
        }
        let ids = self.store.ids().await;
        let total = ids.len();
        let mut connected = 0;
        for id in ids {
            if self.connect(LoginMode::Resume(id.clone())).await.is_some() {
                connected += 1;
            } else {
                warn!(self_id = %id, "account did not reconnect");
            }
        }
        info!(connected, total, "startup reconnection finished");
        connected
    }

    /// Stops every inbound task and waits for them to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        for task in tasks.into_values() {
            if let Err(e) = task.join.await {
                warn!(error = %e, "inbound task ended abnormally");
            }
        }
    }
}
