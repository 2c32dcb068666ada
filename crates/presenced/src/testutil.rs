//! Shared fakes for the daemon's tests: an in-memory store double and a
//! canned analyzer.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;
use presence_core::{AnalyzerError, Descriptor, FaceAnalyzer, FaceRegion};
use presence_store::records::{AttendanceRecord, AttendanceSettings, EmployeeDoc};
use presence_store::{IdentityStore, StoreError};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub struct MockStore {
    employees: Mutex<Vec<EmployeeDoc>>,
    attendance: Mutex<Vec<AttendanceRecord>>,
    settings: Mutex<Option<AttendanceSettings>>,
    failing: AtomicBool,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            employees: Mutex::new(Vec::new()),
            attendance: Mutex::new(Vec::new()),
            settings: Mutex::new(None),
            failing: AtomicBool::new(false),
        })
    }

    /// When set, every store operation fails with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn seed_employee(&self, name: &str, descriptor: Descriptor) {
        self.employees
            .lock()
            .unwrap()
            .push(EmployeeDoc::new(name, descriptor));
    }

    pub fn clear_employees(&self) {
        self.employees.lock().unwrap().clear();
    }

    pub fn employee_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .employees
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn set_settings(&self, settings: AttendanceSettings) {
        *self.settings.lock().unwrap() = Some(settings);
    }

    pub fn attendance_count(&self) -> usize {
        self.attendance.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("mock store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityStore for MockStore {
    async fn load_employees(&self, limit: usize) -> Result<Vec<EmployeeDoc>, StoreError> {
        self.check()?;
        let mut docs = self.employees.lock().unwrap().clone();
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        docs.truncate(limit);
        Ok(docs)
    }

    async fn put_employee(&self, doc: &EmployeeDoc) -> Result<(), StoreError> {
        self.check()?;
        let mut docs = self.employees.lock().unwrap();
        docs.retain(|d| d.name != doc.name);
        docs.push(doc.clone());
        Ok(())
    }

    async fn delete_employee(&self, name: &str) -> Result<bool, StoreError> {
        self.check()?;
        let mut docs = self.employees.lock().unwrap();
        let before = docs.len();
        docs.retain(|d| d.name != name);
        Ok(docs.len() < before)
    }

    async fn last_check_in(&self, name: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        self.check()?;
        Ok(self
            .attendance
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.name == name)
            .max_by_key(|r| r.timestamp)
            .cloned())
    }

    async fn append_check_in(&self, record: &AttendanceRecord) -> Result<(), StoreError> {
        self.check()?;
        self.attendance.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn attendance_settings(&self) -> Result<Option<AttendanceSettings>, StoreError> {
        self.check()?;
        Ok(*self.settings.lock().unwrap())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}

/// Analyzer returning canned regions and a canned descriptor.
pub struct FakeAnalyzer {
    regions: Vec<FaceRegion>,
    descriptor: Descriptor,
    embed_fails: bool,
}

impl FakeAnalyzer {
    pub fn new(regions: Vec<FaceRegion>, descriptor: Descriptor) -> Self {
        Self {
            regions,
            descriptor,
            embed_fails: false,
        }
    }

    pub fn with_embed_failure(mut self) -> Self {
        self.embed_fails = true;
        self
    }
}

impl FaceAnalyzer for FakeAnalyzer {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<FaceRegion>, AnalyzerError> {
        Ok(self.regions.clone())
    }

    fn embed(
        &mut self,
        _image: &RgbImage,
        _region: &FaceRegion,
    ) -> Result<Descriptor, AnalyzerError> {
        if self.embed_fails {
            Err(AnalyzerError::InferenceFailed("fake failure".to_string()))
        } else {
            Ok(self.descriptor.clone())
        }
    }
}

/// A tiny valid PNG as a base64 request payload.
pub fn png_payload() -> String {
    let img = RgbImage::from_pixel(8, 8, image::Rgb([127, 127, 127]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("png encode");
    STANDARD.encode(&buf)
}
