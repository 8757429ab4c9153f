//! In-memory repository manager for lifecycle tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use nexstage_core::coordinate::Coordinates;
use nexstage_core::manifest::StagingConfig;
use nexstage_core::parameters::Parameters;
use nexstage_core::staging::{RepositoryState, StagingProfile, StagingRepositoryInfo};
use nexstage_maven::service::{ArtifactUploader, Capabilities, StagingService};
use nexstage_util::errors::{
    NexstageError, NexstageResult, RepositoryRuleFailures, RuleFailure,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListProfiles,
    SelectProfile(String),
    MatchProfile(String),
    Start(String),
    Deploy { repository: String, path: String },
    Close(Vec<String>),
    Drop(Vec<String>),
    Release(Vec<String>, bool),
    Promote(Vec<String>, String),
    ListRepositories,
    GetRepository(String),
}

/// Server-side fate of a fake repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fate {
    Open,
    Closed,
    Released,
    Dropped,
}

#[derive(Debug, Clone)]
struct Repo {
    profile_id: String,
    fate: Fate,
}

#[derive(Default)]
pub struct FakeService {
    /// Group prefix -> profile.
    profiles: Vec<(String, StagingProfile)>,
    rule_failing_profiles: BTreeSet<String>,
    upload_failing_profiles: BTreeSet<String>,
    release_fails: bool,
    drop_fails: bool,
    extended_release: bool,
    repos: Mutex<BTreeMap<String, Repo>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            extended_release: true,
            ..Default::default()
        }
    }

    /// Artifacts whose group starts with `group` match profile `id`.
    pub fn with_profile(mut self, group: &str, id: &str, name: &str) -> Self {
        self.profiles.push((
            group.to_string(),
            StagingProfile {
                id: id.to_string(),
                name: name.to_string(),
            },
        ));
        self
    }

    pub fn failing_rules_for(mut self, profile_id: &str) -> Self {
        self.rule_failing_profiles.insert(profile_id.to_string());
        self
    }

    pub fn failing_uploads_for(mut self, profile_id: &str) -> Self {
        self.upload_failing_profiles.insert(profile_id.to_string());
        self
    }

    pub fn failing_release(mut self) -> Self {
        self.release_fails = true;
        self
    }

    pub fn failing_drop(mut self) -> Self {
        self.drop_fails = true;
        self
    }

    pub fn without_extended_release(mut self) -> Self {
        self.extended_release = false;
        self
    }

    /// A repository that exists before the build starts.
    pub fn with_repository(self, id: &str, profile_id: &str, fate: Fate) -> Self {
        self.repos.lock().unwrap().insert(
            id.to_string(),
            Repo {
                profile_id: profile_id.to_string(),
                fate,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fate(&self, id: &str) -> Option<Fate> {
        self.repos.lock().unwrap().get(id).map(|r| r.fate)
    }

    pub fn repository_ids(&self) -> Vec<String> {
        self.repos.lock().unwrap().keys().cloned().collect()
    }

    pub fn started(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Start(_)))
            .count()
    }

    pub fn deployed_paths(&self, repository_id: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Deploy { repository, path } if repository == repository_id => Some(path),
                _ => None,
            })
            .collect()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn profile_of(&self, repository_id: &str) -> Option<String> {
        self.repos
            .lock()
            .unwrap()
            .get(repository_id)
            .map(|r| r.profile_id.clone())
    }

    fn set_fate(&self, id: &str, fate: Fate) {
        if let Some(repo) = self.repos.lock().unwrap().get_mut(id) {
            repo.fate = fate;
        }
    }

    fn info(&self, id: &str, repo: &Repo) -> StagingRepositoryInfo {
        let state = match repo.fate {
            Fate::Open => RepositoryState::Open,
            Fate::Closed => RepositoryState::Closed,
            Fate::Released => RepositoryState::Released,
            Fate::Dropped => RepositoryState::NotFound,
        };
        StagingRepositoryInfo {
            repository_id: id.to_string(),
            profile_id: repo.profile_id.clone(),
            profile_name: repo.profile_id.clone(),
            state,
            transitioning: false,
            url: self.repository_url(id),
            description: None,
        }
    }
}

impl StagingService for FakeService {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            extended_release: self.extended_release,
        }
    }

    fn list_profiles(&self) -> NexstageResult<Vec<StagingProfile>> {
        self.log(Call::ListProfiles);
        Ok(self.profiles.iter().map(|(_, p)| p.clone()).collect())
    }

    fn select_profile(&self, profile_id: &str) -> NexstageResult<StagingProfile> {
        self.log(Call::SelectProfile(profile_id.to_string()));
        self.profiles
            .iter()
            .map(|(_, p)| p)
            .find(|p| p.id == profile_id)
            .cloned()
            .ok_or_else(|| NexstageError::configuration(format!("unknown profile {profile_id}")))
    }

    fn match_profile(&self, coordinates: &Coordinates) -> NexstageResult<StagingProfile> {
        self.log(Call::MatchProfile(coordinates.gav()));
        self.profiles
            .iter()
            .find(|(group, _)| coordinates.group_id.starts_with(group.as_str()))
            .map(|(_, p)| p.clone())
            .ok_or_else(|| NexstageError::configuration("no profile matches"))
    }

    fn start_staging(
        &self,
        profile: &StagingProfile,
        _description: &str,
        _tags: &BTreeMap<String, String>,
    ) -> NexstageResult<String> {
        self.log(Call::Start(profile.id.clone()));
        let mut repos = self.repos.lock().unwrap();
        let id = format!("{}-{}", profile.id, 1001 + repos.len());
        repos.insert(
            id.clone(),
            Repo {
                profile_id: profile.id.clone(),
                fate: Fate::Open,
            },
        );
        Ok(id)
    }

    fn repository_url(&self, repository_id: &str) -> String {
        format!("https://nexus.test/content/repositories/{repository_id}")
    }

    fn deploy_file(&self, repository_id: &str, path: &str, file: &Path) -> NexstageResult<()> {
        assert!(file.is_file(), "{} missing", file.display());
        self.log(Call::Deploy {
            repository: repository_id.to_string(),
            path: path.to_string(),
        });
        let profile = self.profile_of(repository_id).unwrap_or_default();
        if self.upload_failing_profiles.contains(&profile) {
            return Err(NexstageError::remote(Some(400), "upload rejected"));
        }
        Ok(())
    }

    fn finish_staging(&self, repository_ids: &[String], _description: &str) -> NexstageResult<()> {
        self.log(Call::Close(repository_ids.to_vec()));
        let mut failures = Vec::new();
        for id in repository_ids {
            let profile = self.profile_of(id).unwrap_or_default();
            if self.rule_failing_profiles.contains(&profile) {
                failures.push(RepositoryRuleFailures {
                    repository_id: id.clone(),
                    failures: vec![RuleFailure {
                        rule: "Sources Validation".to_string(),
                        messages: vec!["Missing: no sources jar found".to_string()],
                    }],
                });
            } else {
                self.set_fate(id, Fate::Closed);
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(NexstageError::RuleFailure(failures))
        }
    }

    fn drop_staging(&self, repository_ids: &[String], _description: &str) -> NexstageResult<()> {
        self.log(Call::Drop(repository_ids.to_vec()));
        if self.drop_fails {
            return Err(NexstageError::remote(Some(500), "drop failed"));
        }
        for id in repository_ids {
            self.set_fate(id, Fate::Dropped);
        }
        Ok(())
    }

    fn release_staging(
        &self,
        repository_ids: &[String],
        _description: &str,
        auto_drop: bool,
    ) -> NexstageResult<()> {
        self.log(Call::Release(repository_ids.to_vec(), auto_drop));
        if self.release_fails {
            return Err(NexstageError::RuleFailure(vec![RepositoryRuleFailures {
                repository_id: repository_ids.join(","),
                failures: vec![RuleFailure {
                    rule: "Release Rule".to_string(),
                    messages: vec!["release refused".to_string()],
                }],
            }]));
        }
        for id in repository_ids {
            self.set_fate(id, Fate::Released);
        }
        Ok(())
    }

    fn promote_staging(
        &self,
        repository_ids: &[String],
        group_profile_id: &str,
        _description: &str,
    ) -> NexstageResult<()> {
        self.log(Call::Promote(
            repository_ids.to_vec(),
            group_profile_id.to_string(),
        ));
        Ok(())
    }

    fn list_repositories(
        &self,
        profile_id: Option<&str>,
    ) -> NexstageResult<Vec<StagingRepositoryInfo>> {
        self.log(Call::ListRepositories);
        let repos = self.repos.lock().unwrap();
        Ok(repos
            .iter()
            .filter(|(_, r)| profile_id.map_or(true, |p| r.profile_id == p))
            .map(|(id, r)| self.info(id, r))
            .collect())
    }

    fn get_repository(&self, repository_id: &str) -> NexstageResult<StagingRepositoryInfo> {
        self.log(Call::GetRepository(repository_id.to_string()));
        let repos = self.repos.lock().unwrap();
        match repos.get(repository_id) {
            Some(repo) if repo.fate != Fate::Dropped => Ok(self.info(repository_id, repo)),
            _ => Err(NexstageError::remote(Some(404), "no such repository")),
        }
    }
}

/// Uploader that only remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingUploader {
    uploads: Mutex<Vec<(String, String)>>,
}

impl RecordingUploader {
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.uploads()
            .into_iter()
            .map(|(base, path)| format!("{base}/{path}"))
            .collect()
    }
}

impl ArtifactUploader for RecordingUploader {
    fn upload(&self, base_url: &str, path: &str, file: &Path) -> NexstageResult<()> {
        assert!(file.is_file(), "{} missing", file.display());
        self.uploads
            .lock()
            .unwrap()
            .push((base_url.to_string(), path.to_string()));
        Ok(())
    }
}

/// Parameters rooted at `project_root` with test-friendly waits.
pub fn params(project_root: &Path, config: StagingConfig) -> Parameters {
    Parameters::from_config(&config, project_root)
}

/// Write a file with some content, creating parents.
pub fn write_file(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

/// Put a jar and a pom for `group:artifact:version` into the staging area of
/// `profile_id`, as a per-module step would.
pub fn stage_module(params: &Parameters, profile_id: &str, group: &str, artifact: &str, version: &str) {
    let dir = format!(
        "{}/{artifact}/{version}",
        group.replace('.', "/")
    );
    let root = params.staging_root().join(profile_id);
    write_file(&root, &format!("{dir}/{artifact}-{version}.jar"), "jar");
    write_file(&root, &format!("{dir}/{artifact}-{version}.pom"), "<project/>");
}

/// Count `.properties` records under the staging root.
pub fn record_count(params: &Parameters) -> usize {
    std::fs::read_dir(params.staging_root())
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("properties"))
                .count()
        })
        .unwrap_or(0)
}
