use anyhow::{anyhow, Context, Result};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub store_url: String,
    pub local_path: String,
}

/// Saved store/path pairs, one JSON file under the platform config dir.
pub struct ProfileManager {
    path: PathBuf,
}

impl ProfileManager {
    pub fn new() -> Self {
        let path = directories::ProjectDirs::from("", "", "pail")
            .map(|dirs| dirs.config_dir().join("profiles.json"))
            .unwrap_or_else(|| PathBuf::from(".pail-profiles.json"));
        Self { path }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<Vec<Profile>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn save(&self, profiles: &[Profile]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(profiles)?;
        std::fs::write(&self.path, raw).with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn list(&self) -> Result<Vec<Profile>> {
        self.load()
    }

    pub fn find(&self, name_or_id: &str) -> Result<Profile> {
        let profiles = self.list()?;
        profiles
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name_or_id) || p.id == name_or_id)
            .ok_or_else(|| anyhow!("Profile '{}' not found", name_or_id))
    }

    pub fn add(
        &self,
        id: String,
        name: String,
        store_url: String,
        local_path: Utf8PathBuf,
    ) -> Result<Profile> {
        let mut profiles = self.list()?;

        if id.trim().is_empty() {
            return Err(anyhow!("Profile ID cannot be empty"));
        }
        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(anyhow!("Profile ID must use only a-z, 0-9, - and _"));
        }
        if profiles.iter().any(|p| p.id == id) {
            return Err(anyhow!("A profile with ID '{}' already exists", id));
        }

        let profile = Profile {
            id,
            name,
            store_url,
            local_path: local_path.to_string(),
        };

        profiles.push(profile.clone());
        self.save(&profiles)?;
        Ok(profile)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut profiles = self.list()?;
        let original_len = profiles.len();
        profiles.retain(|p| p.id != name && !p.name.eq_ignore_ascii_case(name));

        if profiles.len() == original_len {
            return Err(anyhow!("Profile '{}' not found", name));
        }

        self.save(&profiles)?;
        Ok(())
    }
}

impl Default for ProfileManager {
    fn default() -> Self {
        Self::new()
    }
}

pub fn handle_list() -> Result<()> {
    let mgr = ProfileManager::new();
    let profiles = mgr.list()?;

    if profiles.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    println!("{:<20} {:<24} {:<40}", "ID", "NAME", "PATH");
    println!("{:-<20} {:-<24} {:-<40}", "", "", "");
    for p in profiles {
        println!("{:<20} {:<24} {:<40}", p.id, p.name, p.local_path);
    }

    Ok(())
}

pub fn handle_add(id: String, name: String, store: String, path: Utf8PathBuf) -> Result<()> {
    let mgr = ProfileManager::new();
    let p = mgr.add(id, name, store, path)?;
    println!("Profile '{}' ({}) created successfully.", p.name, p.id);
    Ok(())
}

pub fn handle_remove(name: String) -> Result<()> {
    let mgr = ProfileManager::new();
    mgr.remove(&name)?;
    println!("Profile '{}' removed.", name);
    Ok(())
}
