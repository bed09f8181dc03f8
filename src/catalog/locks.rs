//! Per-video processing locks.
//!
//! Held by the orchestrator for the whole extract/transcribe/commit cycle and
//! by the scanner while it rewrites a row, so the two never race on one video.

use crate::error::{Result, VidscribeError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Set of video ids currently being worked on.
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    held: Arc<Mutex<HashSet<i64>>>,
}

impl LockRegistry {
    /// Acquire the lock for `video_id` without waiting.
    pub fn try_lock(&self, video_id: i64) -> Result<VideoLock> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| VidscribeError::Catalog(format!("Failed to acquire lock: {}", e)))?;

        if !held.insert(video_id) {
            return Err(VidscribeError::LockContention(format!("id {}", video_id)));
        }

        debug!(video_id, "Acquired processing lock");
        Ok(VideoLock {
            video_id,
            held: Arc::clone(&self.held),
        })
    }
}

/// Guard releasing the video's lock when dropped.
#[derive(Debug)]
pub struct VideoLock {
    video_id: i64,
    held: Arc<Mutex<HashSet<i64>>>,
}

impl Drop for VideoLock {
    fn drop(&mut self) {
        if let Ok(mut held) = self.held.lock() {
            held.remove(&self.video_id);
            debug!(video_id = self.video_id, "Released processing lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lock_is_rejected_until_release() {
        let registry = LockRegistry::default();

        let guard = registry.try_lock(7).unwrap();

        let err = registry.try_lock(7).unwrap_err();
        assert!(matches!(err, VidscribeError::LockContention(_)));

        // Other videos are unaffected.
        let _other = registry.try_lock(8).unwrap();

        drop(guard);
        assert!(registry.try_lock(7).is_ok());
        assert!(registry.held.lock().unwrap().contains(&8));
    }
}
