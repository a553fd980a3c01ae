use std::{future::Future, io::ErrorKind, path::PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use crate::lens::LensProfile;

const PROFILE_FILE: &str = "profile.json";

/// Interface for abstracting storage of the lens profile.
pub trait ProfileStorage {
    /// Returns the stored profile, if there is one.
    fn load(&self) -> impl Future<Output = Result<Option<LensProfile>>> + Send;

    fn save(&self, profile: &LensProfile) -> impl Future<Output = Result<()>> + Send;

    /// Returns the stored profile or a fresh one starting on `today`.
    fn load_or_default(&self, today: NaiveDate) -> impl Future<Output = Result<LensProfile>> + Send
    where
        Self: Sync,
    {
        async move { Ok(self.load().await?.unwrap_or_else(|| LensProfile::new(today))) }
    }
}

/// The main realization of [ProfileStorage].
pub struct ProfileStorageImpl {
    path: PathBuf,
}

impl ProfileStorageImpl {
    pub fn new(app_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&app_dir)?;

        Ok(Self {
            path: app_dir.join(PROFILE_FILE),
        })
    }
}

impl ProfileStorage for ProfileStorageImpl {
    async fn load(&self) -> Result<Option<LensProfile>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };
        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        read?;

        debug!("Loaded profile from {:?}", self.path);
        match serde_json::from_str::<LensProfile>(&contents) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!(
                    "Profile in {:?} is not valid json, starting over: {e}",
                    self.path
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, profile: &LensProfile) -> Result<()> {
        let contents = serde_json::to_string_pretty(profile)?;
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;

        file.lock_exclusive()?;
        let result = async {
            file.rewind().await?;
            file.set_len(0).await?;
            file.write_all(contents.as_bytes()).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;
        file.unlock_async().await?;
        result?;

        debug!("Saved profile to {:?}", self.path);
        Ok(())
    }
}
