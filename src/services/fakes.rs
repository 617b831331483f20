// src/services/fakes.rs
//! In-memory stand-ins for the integration traits, used by tests

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::ai_analysis::{AiAnalyzer, AiError, AnalysisResult, CandidateProfile};
use super::email::{EmailError, EmailSender, OutgoingEmail, SentEmail};
use super::google::{CalendarEvent, CalendarEventResponse, CalendarProvider, GoogleError};
use super::storage::{FileStorage, StorageError};
use super::supabase_auth::{AuthAdmin, AuthAdminError, AuthUser, NewAuthUser};

#[derive(Default)]
pub struct FakeAuthAdmin {
    created: Mutex<Vec<AuthUser>>,
    deleted: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FakeAuthAdmin {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<AuthUser> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthAdmin for FakeAuthAdmin {
    async fn create_user(&self, user: &NewAuthUser) -> Result<AuthUser, AuthAdminError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthAdminError::Api {
                status: 500,
                message: "fake auth failure".to_string(),
            });
        }
        let created = AuthUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(user.email.clone()),
        };
        self.created.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AuthAdminError> {
        self.deleted.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEmailSender {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: AtomicBool,
}

impl FakeEmailSender {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for FakeEmailSender {
    async fn send(&self, email: OutgoingEmail) -> Result<SentEmail, EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::Api {
                status: 503,
                message: "fake email failure".to_string(),
            });
        }
        self.sent.lock().unwrap().push(email);
        Ok(SentEmail {
            id: uuid::Uuid::new_v4().to_string(),
        })
    }
}

#[derive(Default)]
pub struct FakeCalendar {
    created: AtomicUsize,
    deleted: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FakeCalendar {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarProvider for FakeCalendar {
    async fn create_event(&self, event: &CalendarEvent) -> Result<CalendarEventResponse, GoogleError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GoogleError::CalendarError("fake calendar failure".to_string()));
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CalendarEventResponse {
            id: format!("evt-{}", n),
            html_link: None,
            meet_link: event
                .create_meet_link
                .then(|| format!("https://meet.google.com/fake-{}", n)),
        })
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), GoogleError> {
        self.deleted.lock().unwrap().push(event_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
}

impl FakeStorage {
    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl FileStorage for FakeStorage {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match self.objects.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    async fn signed_url(&self, path: &str, expires_in_secs: u64) -> Result<String, StorageError> {
        if !self.contains(path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(format!(
            "https://storage.test/{}?expires={}",
            path, expires_in_secs
        ))
    }
}

pub struct FakeAiAnalyzer {
    result: Mutex<Result<AnalysisResult, String>>,
    calls: AtomicUsize,
}

impl Default for FakeAiAnalyzer {
    fn default() -> Self {
        Self {
            result: Mutex::new(Ok(AnalysisResult {
                score: 78,
                summary: "Perfil sólido para el cargo".to_string(),
                strengths: vec!["Experiencia en Rust".to_string()],
                weaknesses: vec!["Poca experiencia liderando equipos".to_string()],
                recommendation: "avanzar".to_string(),
            })),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeAiAnalyzer {
    pub fn set_failure(&self, message: &str) {
        *self.result.lock().unwrap() = Err(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiAnalyzer for FakeAiAnalyzer {
    async fn analyze(&self, _task_type: &str, _profile: &CandidateProfile) -> Result<AnalysisResult, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .lock()
            .unwrap()
            .clone()
            .map_err(AiError::InvalidResponse)
    }
}
