//! A labeling session: an ordered image list, the class list, every image's
//! boxes and the canvas for the image currently open.
//!
//! The session is the glue between the canvas and the outside world. Edits
//! made on the canvas are copied into the [`AnnotationStore`] by
//! [`LabelingSession::sync`], auto-save decides when a changed image is
//! written, and navigation flushes the current image before switching.
//! Writing goes through a [`BoxPersistence`] collaborator supplied by the
//! caller.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auto_save::AutoSaveManager;
use crate::canvas::Canvas;
use crate::format::{
    DatasetExportOptions, ExportResult, StoredAnnotation, boxes_to_stored, export_dataset,
    stored_to_boxes,
};
use crate::image_source::{CachedImageSource, ImageSource};
use crate::keybindings::{Key, KeyAction, KeyBindings, Modifiers};
use crate::model::{ClassDef, ClassList, LabelBox, Size};
use crate::store::AnnotationStore;

/// Current session file version.
pub const SESSION_VERSION: u32 = 1;

/// Errors from session persistence.
#[derive(Error, Debug)]
pub enum SessionError {
    /// I/O error reading or writing a session file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session file could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Session file written by a newer version
    #[error("Session file version {found} is newer than supported version {supported}")]
    VersionTooNew {
        /// Version found in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },

    /// The persistence collaborator failed
    #[error("Failed to persist '{key}': {message}")]
    Persistence {
        /// Image key
        key: String,
        /// Reason reported by the collaborator
        message: String,
    },
}

impl SessionError {
    /// Create a persistence error.
    pub fn persistence(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Where per-image boxes are loaded from and saved to.
pub trait BoxPersistence {
    /// Stored records for an image. Unknown images yield an empty list.
    fn load_boxes(&mut self, key: &str) -> Result<Vec<StoredAnnotation>, SessionError>;

    /// Replace the stored records of an image.
    fn save_boxes(&mut self, key: &str, records: Vec<StoredAnnotation>)
    -> Result<(), SessionError>;
}

/// In-memory persistence, for tests and for sessions without a backing store.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    records: HashMap<String, Vec<StoredAnnotation>>,
    /// Fail every save (for exercising error paths)
    pub fail_saves: bool,
    saves: usize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self, key: &str) -> Option<&[StoredAnnotation]> {
        self.records.get(key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: impl Into<String>, records: Vec<StoredAnnotation>) {
        self.records.insert(key.into(), records);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl BoxPersistence for MemoryPersistence {
    fn load_boxes(&mut self, key: &str) -> Result<Vec<StoredAnnotation>, SessionError> {
        Ok(self.records.get(key).cloned().unwrap_or_default())
    }

    fn save_boxes(
        &mut self,
        key: &str,
        records: Vec<StoredAnnotation>,
    ) -> Result<(), SessionError> {
        if self.fail_saves {
            return Err(SessionError::persistence(key, "save rejected"));
        }
        self.records.insert(key.to_string(), records);
        self.saves += 1;
        Ok(())
    }
}

/// One image in the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEntry {
    /// Stable key (file name or record id)
    pub key: String,
    /// Pixel size, once known
    pub size: Option<Size>,
}

impl ImageEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
        }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }
}

/// Saved session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub classes: ClassList,
    /// Image key -> boxes
    #[serde(default, alias = "annos")]
    pub annotations: BTreeMap<String, Vec<LabelBox>>,
    #[serde(default, alias = "activeClassId")]
    pub active_class_id: u32,
    /// Index of the open image
    #[serde(default, alias = "idx")]
    pub index: usize,
}

fn default_version() -> u32 {
    SESSION_VERSION
}

impl Default for SessionFile {
    fn default() -> Self {
        Self {
            version: SESSION_VERSION,
            classes: ClassList::default(),
            annotations: BTreeMap::new(),
            active_class_id: 0,
            index: 0,
        }
    }
}

impl SessionFile {
    /// Load a session file, rejecting files from a newer version.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let contents = std::fs::read_to_string(path)?;
        let file: SessionFile = serde_json::from_str(&contents)?;
        if file.version > SESSION_VERSION {
            return Err(SessionError::VersionTooNew {
                found: file.version,
                supported: SESSION_VERSION,
            });
        }
        log::info!(
            "Loaded session from {:?}: {} images with boxes",
            path,
            file.annotations.len()
        );
        Ok(file)
    }

    /// Save as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Saved session to {:?}", path);
        Ok(())
    }
}

/// State of one labeling session.
#[derive(Debug)]
pub struct LabelingSession {
    images: Vec<ImageEntry>,
    index: usize,
    /// Whether any image has been opened yet
    opened: bool,
    classes: ClassList,
    store: AnnotationStore,
    canvas: Canvas,
    auto_save: AutoSaveManager,
    keybindings: KeyBindings,
}

impl LabelingSession {
    /// Create a session over `images` with the default classes. Call
    /// [`Self::open`] to show the first image.
    pub fn new(images: Vec<ImageEntry>) -> Self {
        Self {
            images,
            index: 0,
            opened: false,
            classes: ClassList::default(),
            store: AnnotationStore::new(),
            canvas: Canvas::new(),
            auto_save: AutoSaveManager::new(),
            keybindings: KeyBindings::default(),
        }
    }

    pub fn with_classes(mut self, classes: ClassList) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_auto_save(mut self, auto_save: AutoSaveManager) -> Self {
        self.auto_save = auto_save;
        self
    }

    pub fn with_keybindings(mut self, keybindings: KeyBindings) -> Self {
        self.keybindings = keybindings;
        self
    }

    // ---- accessors ----

    pub fn images(&self) -> &[ImageEntry] {
        &self.images
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&ImageEntry> {
        self.images.get(self.index)
    }

    pub fn current_key(&self) -> Option<&str> {
        self.current().map(|e| e.key.as_str())
    }

    pub fn classes(&self) -> &ClassList {
        &self.classes
    }

    pub fn active_class(&self) -> u32 {
        self.canvas.active_class()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Canvas for pointer and view input. Call [`Self::sync`] afterwards.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn auto_save(&self) -> &AutoSaveManager {
        &self.auto_save
    }

    /// Switch timed saves on or off. Navigation still flushes.
    pub fn set_auto_save_enabled(&mut self, enabled: bool) {
        self.auto_save.set_enabled(enabled);
    }

    /// Images with at least one box, and the total number of images.
    pub fn progress(&self) -> (usize, usize) {
        let labeled = self
            .images
            .iter()
            .filter(|e| !self.store.get_boxes(&e.key).is_empty())
            .count();
        (labeled, self.images.len())
    }

    // ---- image lifecycle ----

    /// Show image `index`, loading its boxes on first visit.
    ///
    /// A failed load is logged and the image starts out empty. Returns false
    /// if the index is out of range.
    pub fn open<P: BoxPersistence + ?Sized>(&mut self, index: usize, persistence: &mut P) -> bool {
        let Some(entry) = self.images.get(index) else {
            return false;
        };
        let key = entry.key.clone();
        let size = entry.size;

        if !self.store.is_loaded(&key) {
            let boxes = match persistence.load_boxes(&key) {
                Ok(records) => stored_to_boxes(&records, size.unwrap_or_default()),
                Err(e) => {
                    log::warn!("Failed to load boxes for {}: {}", key, e);
                    Vec::new()
                }
            };
            self.store.load(&key, boxes);
        }

        self.index = index;
        self.opened = true;
        self.canvas
            .load_image(self.store.get_boxes(&key).to_vec(), size);
        log::debug!("Opened image {} ({})", index, key);
        true
    }

    /// Record the decoded size of the current image.
    pub fn set_image_size(&mut self, size: Size) {
        if let Some(entry) = self.images.get_mut(self.index) {
            entry.size = Some(size);
        }
        self.canvas.set_image_size(size);
    }

    /// Copy canvas edits into the store and schedule an auto-save.
    pub fn sync(&mut self) {
        if !self.canvas.take_changed() {
            return;
        }
        let Some(key) = self.images.get(self.index).map(|e| e.key.clone()) else {
            return;
        };
        if self.store.set_boxes(&key, self.canvas.boxes().to_vec()) {
            self.auto_save.mark_dirty(&key);
        }
    }

    // ---- persistence ----

    fn save_key<P: BoxPersistence + ?Sized>(
        &mut self,
        key: &str,
        persistence: &mut P,
    ) -> Result<(), SessionError> {
        let size = self
            .images
            .iter()
            .find(|e| e.key == key)
            .and_then(|e| e.size)
            .unwrap_or_default();
        let records = boxes_to_stored(self.store.get_boxes(key), size);
        match persistence.save_boxes(key, records) {
            Ok(()) => {
                self.store.mark_clean(key);
                self.auto_save.mark_saved(key);
                log::info!("Saved {} boxes for {}", self.store.get_boxes(key).len(), key);
                Ok(())
            }
            Err(e) => {
                self.auto_save.mark_save_failed(key);
                Err(e)
            }
        }
    }

    /// Save the current image now, regardless of the debounce timer.
    pub fn save_current<P: BoxPersistence + ?Sized>(
        &mut self,
        persistence: &mut P,
    ) -> Result<(), SessionError> {
        self.sync();
        let Some(key) = self.current_key().map(str::to_string) else {
            return Ok(());
        };
        self.save_key(&key, persistence)
    }

    /// Save every image whose debounce delay has passed. Failures are
    /// logged and retried later. Returns the keys that were saved.
    pub fn tick<P: BoxPersistence + ?Sized>(&mut self, persistence: &mut P) -> Vec<String> {
        self.sync();
        let mut saved = Vec::new();
        for key in self.auto_save.due() {
            match self.save_key(&key, persistence) {
                Ok(()) => saved.push(key),
                Err(e) => log::warn!("Auto-save while editing failed: {}", e),
            }
        }
        saved
    }

    /// Move to image `index`, flushing the current image first if it has
    /// unsaved edits. A failed flush is logged and does not block the move.
    /// On a session where nothing is open yet this behaves like [`Self::open`].
    pub fn go_to<P: BoxPersistence + ?Sized>(&mut self, index: usize, persistence: &mut P) -> bool {
        if index >= self.images.len() {
            return false;
        }
        if !self.opened {
            return self.open(index, persistence);
        }
        if index == self.index {
            return false;
        }
        self.sync();
        let unsaved = self
            .current_key()
            .filter(|key| self.auto_save.needs_flush(key) || self.store.is_dirty(key))
            .map(str::to_string);
        if let Some(key) = unsaved {
            if let Err(e) = self.save_key(&key, persistence) {
                log::warn!("Auto-save failed: {}", e);
            }
        }
        self.open(index, persistence)
    }

    pub fn next<P: BoxPersistence + ?Sized>(&mut self, persistence: &mut P) -> bool {
        self.go_to(self.index + 1, persistence)
    }

    pub fn prev<P: BoxPersistence + ?Sized>(&mut self, persistence: &mut P) -> bool {
        match self.index.checked_sub(1) {
            Some(index) => self.go_to(index, persistence),
            None => false,
        }
    }

    // ---- classes ----

    /// Make `class_id` active. A selected box is re-tagged.
    pub fn set_active_class(&mut self, class_id: u32) {
        self.canvas.set_active_class(class_id);
        self.sync();
    }

    /// Add a class with the smallest free id.
    pub fn add_class(&mut self) -> Option<u32> {
        self.classes.add()
    }

    pub fn rename_class(&mut self, id: u32, name: &str) -> bool {
        self.classes.rename(id, name)
    }

    /// Delete a class. Deleting the active class makes class 0 active.
    pub fn delete_class(&mut self, id: u32) -> Option<ClassDef> {
        let removed = self.classes.remove(id)?;
        if self.active_class() == id {
            self.set_active_class(0);
        }
        Some(removed)
    }

    // ---- keyboard ----

    /// Handle a key press. Returns the action that was performed.
    pub fn handle_key<P: BoxPersistence + ?Sized>(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        text_input_focused: bool,
        persistence: &mut P,
    ) -> Result<Option<KeyAction>, SessionError> {
        let Some(action) = self
            .keybindings
            .action_for(key, modifiers, text_input_focused)
        else {
            return Ok(None);
        };
        match action {
            KeyAction::SelectClass(position) => match self.classes.id_for_hotkey(position) {
                Some(id) => self.set_active_class(id),
                None => return Ok(None),
            },
            KeyAction::PreviousImage => {
                self.prev(persistence);
            }
            KeyAction::NextImage => {
                self.next(persistence);
            }
            KeyAction::DeleteSelected => {
                self.canvas.delete_selected();
                self.sync();
            }
            KeyAction::SaveCurrent => self.save_current(persistence)?,
        }
        Ok(Some(action))
    }

    // ---- export and session files ----

    /// Export every image in session order. Known image sizes are used
    /// without asking `source`.
    pub fn export<S: ImageSource>(
        &mut self,
        source: S,
        options: &DatasetExportOptions,
    ) -> ExportResult {
        self.sync();
        let mut cached = CachedImageSource::new(source);
        for entry in &self.images {
            if let Some(size) = entry.size {
                cached.insert_known(entry.key.clone(), size);
            }
        }
        let images = self
            .images
            .iter()
            .map(|e| (e.key.as_str(), self.store.get_boxes(&e.key)));
        export_dataset(images, &mut cached, &self.classes, options)
    }

    /// Current state as a session file.
    pub fn snapshot(&mut self) -> SessionFile {
        self.sync();
        SessionFile {
            version: SESSION_VERSION,
            classes: self.classes.clone(),
            annotations: self
                .store
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
            active_class_id: self.active_class(),
            index: self.index,
        }
    }

    /// Replace classes and boxes from a session file and reopen its image.
    pub fn restore<P: BoxPersistence + ?Sized>(&mut self, file: SessionFile, persistence: &mut P) {
        self.classes = file.classes;
        self.store = AnnotationStore::new();
        self.auto_save.reset();
        for (key, boxes) in file.annotations {
            self.store.load(&key, boxes);
        }
        self.canvas.set_active_class(file.active_class_id);
        let index = file.index.min(self.images.len().saturating_sub(1));
        self.open(index, persistence);
    }
}
