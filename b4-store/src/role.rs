use crate::error::StoreError;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessRole {
    Live,
    Monitor,
}

impl ProcessRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessRole::Live => "LIVE",
            ProcessRole::Monitor => "MONITOR",
        }
    }

    fn required_path_fragment(&self) -> &'static str {
        match self {
            ProcessRole::Live => "live",
            ProcessRole::Monitor => "monitor",
        }
    }

    /// LIVE processes must point at a DB path whose filename contains
    /// `"live"`; MONITOR processes at one containing `"monitor"`.
    pub fn assert_db_path_convention(&self, db_path: &Path) -> Result<(), StoreError> {
        let filename = db_path
            .file_name()
            .map(|f| f.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let expected = self.required_path_fragment();
        if filename.contains(expected) {
            Ok(())
        } else {
            Err(StoreError::RoleMismatch {
                role: self.as_str().to_string(),
                expected: expected.to_string(),
                path: db_path.display().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn live_accepts_live_path() {
        let role = ProcessRole::Live;
        assert!(role.assert_db_path_convention(&PathBuf::from("/data/b4-live.db")).is_ok());
    }

    #[test]
    fn live_rejects_monitor_path() {
        let role = ProcessRole::Live;
        assert!(role.assert_db_path_convention(&PathBuf::from("/data/b4-monitor.db")).is_err());
    }

    #[test]
    fn monitor_accepts_monitor_path() {
        let role = ProcessRole::Monitor;
        assert!(role.assert_db_path_convention(&PathBuf::from("/data/b4-monitor.db")).is_ok());
    }
}
