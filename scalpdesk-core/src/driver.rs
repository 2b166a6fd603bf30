//! Single-consumer session driver.
//!
//! The session is not built for concurrent mutation, so it is moved onto one
//! dedicated thread and every producer (feed callbacks, user actions, status
//! queries) talks to it through an `mpsc` channel. Commands are applied in
//! the order they arrive.

use crate::domain::{Candle, CandleUpdate, Position, Side, Trade};
use crate::feed::Timeframe;
use crate::session::{Session, SessionError};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("session thread is gone")]
    Disconnected,

    #[error("session thread panicked")]
    Panicked,

    #[error("failed to spawn session thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

type Reply<T> = Sender<Result<T, SessionError>>;
type Query = Box<dyn FnOnce(&Session) + Send>;

/// Commands executed on the session thread.
pub enum SessionCommand {
    ReplaceHistory { epoch: u64, candles: Vec<Candle> },
    Update { epoch: u64, update: CandleUpdate },
    SwitchMarket {
        symbol: String,
        timeframe: Timeframe,
        reply: Reply<u64>,
    },
    OpenManual { side: Side, reply: Reply<Position> },
    CloseManual { reply: Reply<Trade> },
    ResetLedger { reply: Reply<()> },
    Query(Query),
    Shutdown,
}

/// Cloneable producer side of the driver.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Sender<SessionCommand>,
}

impl SessionHandle {
    fn send(&self, cmd: SessionCommand) -> Result<(), DriverError> {
        self.tx.send(cmd).map_err(|_| DriverError::Disconnected)
    }

    fn call<T>(&self, make: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T, DriverError> {
        let (reply, rx) = mpsc::channel();
        self.send(make(reply))?;
        let result = rx.recv().map_err(|_| DriverError::Disconnected)?;
        Ok(result?)
    }

    pub fn replace_history(&self, epoch: u64, candles: Vec<Candle>) -> Result<(), DriverError> {
        self.send(SessionCommand::ReplaceHistory { epoch, candles })
    }

    pub fn update(&self, epoch: u64, update: CandleUpdate) -> Result<(), DriverError> {
        self.send(SessionCommand::Update { epoch, update })
    }

    pub fn switch_market(&self, symbol: &str, timeframe: Timeframe) -> Result<u64, DriverError> {
        let symbol = symbol.to_string();
        self.call(|reply| SessionCommand::SwitchMarket {
            symbol,
            timeframe,
            reply,
        })
    }

    pub fn open_manual(&self, side: Side) -> Result<Position, DriverError> {
        self.call(|reply| SessionCommand::OpenManual { side, reply })
    }

    pub fn close_manual(&self) -> Result<Trade, DriverError> {
        self.call(|reply| SessionCommand::CloseManual { reply })
    }

    pub fn reset_ledger(&self) -> Result<(), DriverError> {
        self.call(|reply| SessionCommand::ResetLedger { reply })
    }

    /// Run `f` against the session after every command queued before it.
    pub fn query<R, F>(&self, f: F) -> Result<R, DriverError>
    where
        R: Send + 'static,
        F: FnOnce(&Session) -> R + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.send(SessionCommand::Query(Box::new(move |s| {
            let _ = tx.send(f(s));
        })))?;
        rx.recv().map_err(|_| DriverError::Disconnected)
    }
}

/// Owns the session thread.
pub struct SessionDriver {
    handle: SessionHandle,
    join: JoinHandle<Session>,
}

impl SessionDriver {
    pub fn spawn(session: Session) -> Result<Self, DriverError> {
        let (tx, rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("scalpdesk-session".into())
            .spawn(move || run(session, rx))?;
        Ok(Self {
            handle: SessionHandle { tx },
            join,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Drain queued commands, stop the thread and hand the session back.
    pub fn shutdown(self) -> Result<Session, DriverError> {
        // A closed channel means the thread already exited; join reports how.
        let _ = self.handle.send(SessionCommand::Shutdown);
        self.join.join().map_err(|_| DriverError::Panicked)
    }
}

fn run(mut session: Session, rx: Receiver<SessionCommand>) -> Session {
    tracing::debug!("session thread started");
    while let Ok(cmd) = rx.recv() {
        match cmd {
            SessionCommand::ReplaceHistory { epoch, candles } => {
                session.replace_history(epoch, candles);
            }
            SessionCommand::Update { epoch, update } => {
                session.on_update(epoch, update);
            }
            SessionCommand::SwitchMarket {
                symbol,
                timeframe,
                reply,
            } => {
                let _ = reply.send(session.switch_market(&symbol, timeframe));
            }
            SessionCommand::OpenManual { side, reply } => {
                let _ = reply.send(session.open_manual(side));
            }
            SessionCommand::CloseManual { reply } => {
                let _ = reply.send(session.close_manual());
            }
            SessionCommand::ResetLedger { reply } => {
                let _ = reply.send(session.reset_ledger());
            }
            SessionCommand::Query(f) => f(&session),
            SessionCommand::Shutdown => break,
        }
    }
    tracing::debug!("session thread stopped");
    session
}
