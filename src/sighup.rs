//! SIGHUP listener: reloads configuration on signal, the same shape as
//! the teacher's `sighup.rs`.

#[cfg(target_family = "unix")]
use tokio::signal::unix::*;

pub struct Sighup {
    #[cfg(target_family = "unix")]
    sig: Signal,
}

impl Sighup {
    pub fn new() -> std::io::Result<Self> {
        #[cfg(target_family = "unix")]
        {
            let sig = signal(SignalKind::hangup())?;
            Ok(Self { sig })
        }
        #[cfg(not(target_family = "unix"))]
        {
            Ok(Self {})
        }
    }

    pub async fn listen(&mut self) {
        #[cfg(target_family = "unix")]
        self.sig.recv().await;

        #[cfg(not(target_family = "unix"))]
        loop {
            use std::time::Duration;
            use tokio::time::sleep;

            sleep(Duration::MAX).await;
        }
    }
}
