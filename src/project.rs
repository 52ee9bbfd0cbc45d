use uuid::Uuid;

use crate::canvas::PixelGrid;
use crate::config::BoardSettings;
use crate::error::{BoardError, Result};
use crate::io::{DesignBackend, Submission, encode_pixel_data};
use crate::session::EditingSession;
use crate::{log_err, log_info};

/// Single open design.
pub struct Project {
    /// Local identity, independent of the backend's design id.
    pub id: Uuid,
    pub session: EditingSession,
    pub title: String,
    /// Opaque id of the user who will own a newly created design.
    pub owner_id: String,
    /// `None` until the design has been stored once.
    pub design_id: Option<u64>,
    /// Title and grid as last opened or saved.
    saved_title: String,
    saved_grid: PixelGrid,
    /// Set by [`mark_dirty`](Self::mark_dirty) for changes outside the grid
    /// and title.
    forced_dirty: bool,
}

impl Project {
    pub fn new_untitled(owner_id: impl Into<String>, settings: &BoardSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            session: EditingSession::with_settings(settings),
            title: String::new(),
            owner_id: owner_id.into(),
            design_id: None,
            saved_title: String::new(),
            saved_grid: PixelGrid::new(),
            forced_dirty: false,
        }
    }

    /// Fetch an existing design and open it for editing.
    pub fn open(
        backend: &impl DesignBackend,
        design_id: u64,
        owner_id: impl Into<String>,
        settings: &BoardSettings,
    ) -> Result<Self> {
        let record = backend.fetch(design_id)?;
        let mut project = Self::new_untitled(owner_id, settings);
        project.session.load_design(&record.pixel_data);
        project.title = record.title;
        project.design_id = Some(record.design_id.unwrap_or(design_id));
        project.mark_clean();
        log_info!(
            "Opened design {} ({} cells)",
            design_id,
            project.session.grid().len()
        );
        Ok(project)
    }

    /// Unsaved changes: the grid or title differs from the last save, or
    /// the project was explicitly marked dirty.  Undoing back to the saved
    /// grid makes it clean again.
    pub fn is_dirty(&self) -> bool {
        self.forced_dirty
            || self.title != self.saved_title
            || self.session.grid() != &self.saved_grid
    }

    pub fn mark_dirty(&mut self) {
        self.forced_dirty = true;
    }

    /// Take the current title and grid as the saved state.
    pub fn mark_clean(&mut self) {
        self.saved_title = self.title.clone();
        self.saved_grid = self.session.grid().clone();
        self.forced_dirty = false;
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        let name = if self.title.trim().is_empty() {
            "Untitled"
        } else {
            self.title.as_str()
        };
        if self.is_dirty() {
            format!("{}*", name)
        } else {
            name.to_string()
        }
    }

    /// Checks done before anything is sent to the backend.
    pub fn validate_for_save(&self) -> Result<()> {
        if self.session.grid().is_empty() {
            return Err(BoardError::Validation(
                "Please draw something on the canvas before saving".to_string(),
            ));
        }
        if self.title.trim().is_empty() {
            return Err(BoardError::Validation("Please enter a file name".to_string()));
        }
        Ok(())
    }

    /// Update when the design already exists, create otherwise.
    pub fn submission(&self) -> Result<Submission> {
        self.validate_for_save()?;
        let pixel_data = encode_pixel_data(self.session.grid())?;
        let title = self.title.trim().to_string();
        Ok(match self.design_id {
            Some(design_id) => Submission::Update {
                design_id,
                title,
                pixel_data,
            },
            None => Submission::Create {
                title,
                pixel_data,
                owner_id: self.owner_id.clone(),
            },
        })
    }

    pub fn save(&mut self, backend: &mut impl DesignBackend) -> Result<()> {
        let submission = self.submission()?;
        match backend.submit(&submission).into_result() {
            Ok(()) => {
                log_info!("Saved design '{}'", submission.title());
                self.mark_clean();
                Ok(())
            }
            Err(e) => {
                log_err!("{}", e);
                Err(e)
            }
        }
    }
}
