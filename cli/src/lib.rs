//! Single-user run: log in by QR code, then visit every community and like
//! the newest items of each category.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

use atom_client::{ClientError, ContentClient};
use atom_common::{Category, Community};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

/// Why a run stopped early.
#[derive(Error, Debug)]
pub enum RunError {
    /// The QR login could not be started
    #[error("failed to start login: {0}")]
    Start(#[from] ClientError),

    /// The scan was confirmed but binding the session failed
    #[error("login failed after the scan")]
    BindFailed,

    /// Nobody scanned the code in time
    #[error("no login within {0:?}")]
    TimedOut(Duration),
}

/// Likes per category in one community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityReport {
    /// The community visited
    pub community: Community,
    /// `(category, newly liked)`; empty when switching failed
    pub liked: Vec<(Category, usize)>,
    /// Switch failure, if any
    pub error: Option<String>,
}

impl CommunityReport {
    /// Total likes issued in this community
    pub fn total(&self) -> usize {
        self.liked.iter().map(|(_, n)| n).sum()
    }
}

/// Start a QR login. Returns the QR target and a receiver completed by the
/// login hook.
pub async fn start_login(client: &Arc<ContentClient>) -> Result<(String, oneshot::Receiver<()>), RunError> {
    let (tx, rx) = oneshot::channel();
    let url = client
        .start_login(Some(Box::new(move || {
            tracing::info!("Logged in");
            // The receiver is gone only if the run already gave up.
            let _ = tx.send(());
        })))
        .await?;
    Ok((url, rx))
}

/// Wait for the login hook.
///
/// The login task drops the hook unfired when the bind fails, which ends
/// the wait early. On timeout the pending login is stopped.
pub async fn wait_for_login(
    client: &ContentClient,
    logged_in: oneshot::Receiver<()>,
    within: Duration,
) -> Result<(), RunError> {
    match tokio::time::timeout(within, logged_in).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(RunError::BindFailed),
        Err(_) => {
            client.stop_login().await;
            Err(RunError::TimedOut(within))
        }
    }
}

/// Categories to visit: every category when none was requested, otherwise
/// the requested ones in portal order without repeats.
pub fn selected_categories(requested: &[Category]) -> Vec<Category> {
    if requested.is_empty() {
        return Category::ALL.to_vec();
    }
    Category::ALL
        .into_iter()
        .filter(|category| requested.contains(category))
        .collect()
}

/// Switch to each community in turn and like `count` items in each of
/// `categories`.
///
/// A failed switch skips that community; the rest still run.
pub async fn like_everywhere(
    client: &ContentClient,
    categories: &[Category],
    count: usize,
) -> Vec<CommunityReport> {
    let mut reports = Vec::new();
    for community in client.communities() {
        tracing::info!(community = %community.name, member_id = %community.member_id, "Switching community");
        if let Err(e) = client.select_community(&community.member_id).await {
            tracing::warn!(community = %community.name, error = %e, "Switch failed, skipping");
            reports.push(CommunityReport {
                community,
                liked: Vec::new(),
                error: Some(e.to_string()),
            });
            continue;
        }

        let mut liked = Vec::with_capacity(categories.len());
        for &category in categories {
            let n = match client.like(category, count).await {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(community = %community.name, category = %category, error = %e, "Like failed");
                    0
                }
            };
            tracing::info!(community = %community.name, category = %category, liked = n, "Category done");
            liked.push((category, n));
        }
        reports.push(CommunityReport {
            community,
            liked,
            error: None,
        });
    }
    reports
}
