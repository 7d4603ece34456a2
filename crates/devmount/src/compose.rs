//! Compose override rendering.
//!
//! The override is rebuilt from its template on every run. Generated volume
//! strings are appended to `services.<service>.volumes`; every other node of
//! the template is carried through untouched and in its original order.

use serde_yaml::{Mapping, Value};

use devmount_common::{DevmountError, DevmountResult};

use crate::tree::MountEntry;

/// A compose override document under construction.
#[derive(Debug, Clone)]
pub struct OverrideDocument {
    root: Mapping,
    service: String,
}

impl OverrideDocument {
    /// Start from template text, or from an empty document when `None`.
    ///
    /// # Errors
    ///
    /// Fails when the template is not valid YAML, is not a mapping, or has
    /// a `services` / service node that is not a mapping.
    pub fn from_template(template: Option<&str>, service: &str) -> DevmountResult<Self> {
        let root = match template.map(serde_yaml::from_str::<Value>).transpose()? {
            None | Some(Value::Null) => Mapping::new(),
            Some(Value::Mapping(mapping)) => mapping,
            Some(_) => {
                return Err(DevmountError::InvalidTemplate {
                    message: "top level is not a mapping".to_string(),
                });
            }
        };

        let mut document = Self {
            root,
            service: service.to_string(),
        };
        document.volumes_mut()?;
        Ok(document)
    }

    /// Service receiving the mounts.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Current volume list of the service.
    #[must_use]
    pub fn volumes(&self) -> Vec<String> {
        self.root
            .get("services")
            .and_then(|services| services.get(self.service.as_str()))
            .and_then(|service| service.get("volumes"))
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append mount entries after any volumes already in the template.
    ///
    /// # Errors
    ///
    /// Fails when the service's `volumes` node is neither null nor a list.
    pub fn add_mounts(&mut self, mounts: &[MountEntry]) -> DevmountResult<()> {
        let volumes = self.volumes_mut()?;
        volumes.extend(mounts.iter().map(|entry| Value::String(entry.to_volume())));
        Ok(())
    }

    /// Serialize as YAML.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_yaml`.
    pub fn to_yaml(&self) -> DevmountResult<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// Render a template with `mounts` in one step.
    ///
    /// # Errors
    ///
    /// See [`Self::from_template`] and [`Self::add_mounts`].
    pub fn render(
        template: Option<&str>,
        service: &str,
        mounts: &[MountEntry],
    ) -> DevmountResult<String> {
        let mut document = Self::from_template(template, service)?;
        document.add_mounts(mounts)?;
        document.to_yaml()
    }

    fn volumes_mut(&mut self) -> DevmountResult<&mut Vec<Value>> {
        let services = child_mapping(&mut self.root, "services")?;
        let service = child_mapping(services, &self.service)?;

        let volumes = service
            .entry(Value::String("volumes".to_string()))
            .or_insert(Value::Null);
        if volumes.is_null() {
            *volumes = Value::Sequence(Vec::new());
        }

        match volumes {
            Value::Sequence(seq) => Ok(seq),
            _ => Err(DevmountError::InvalidTemplate {
                message: format!("services.{}.volumes is not a list", self.service),
            }),
        }
    }
}

/// Mapping under `key`, created when absent or null.
fn child_mapping<'a>(parent: &'a mut Mapping, key: &str) -> DevmountResult<&'a mut Mapping> {
    let node = parent
        .entry(Value::String(key.to_string()))
        .or_insert(Value::Null);
    if node.is_null() {
        *node = Value::Mapping(Mapping::new());
    }

    match node {
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(DevmountError::InvalidTemplate {
            message: format!("`{key}` is not a mapping"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::MountMode;
    use std::path::PathBuf;

    fn entry(host: &str, container: &str, mode: MountMode) -> MountEntry {
        MountEntry {
            host_path: PathBuf::from(host),
            container_path: PathBuf::from(container),
            mode,
        }
    }

    #[test]
    fn bare_volumes_key_becomes_list() {
        let template = "services:\n  dev:\n    volumes:\n";
        let yaml = OverrideDocument::render(
            Some(template),
            "dev",
            &[entry("/p/mounted-files/root/a", "/root/a", MountMode::Rw)],
        )
        .unwrap();

        let doc = OverrideDocument::from_template(Some(yaml.as_str()), "dev").unwrap();
        assert_eq!(doc.volumes(), vec!["/p/mounted-files/root/a:/root/a:rw"]);
    }

    #[test]
    fn template_content_preserved() {
        let template = r#"
version: "3.8"
services:
  dev:
    environment:
      EDITOR: vim
    volumes:
      - ./workspace:/workspace
  db:
    image: postgres:16
"#;

        let yaml = OverrideDocument::render(
            Some(template),
            "dev",
            &[entry("/p/m/root/b", "/root/b", MountMode::Ro)],
        )
        .unwrap();

        let value: Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value["version"].as_str(), Some("3.8"));
        assert_eq!(value["services"]["dev"]["environment"]["EDITOR"].as_str(), Some("vim"));
        assert_eq!(value["services"]["db"]["image"].as_str(), Some("postgres:16"));

        let doc = OverrideDocument::from_template(Some(yaml.as_str()), "dev").unwrap();
        assert_eq!(
            doc.volumes(),
            vec!["./workspace:/workspace", "/p/m/root/b:/root/b:ro"]
        );

        let keys: Vec<&str> = value["services"]
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys, vec!["dev", "db"]);
    }

    #[test]
    fn missing_template_builds_skeleton() {
        let doc = OverrideDocument::from_template(None, "workspace").unwrap();
        assert_eq!(doc.service(), "workspace");
        assert!(doc.volumes().is_empty());

        let yaml = doc.to_yaml().unwrap();
        let value: Value = serde_yaml::from_str(&yaml).unwrap();
        assert!(value["services"]["workspace"]["volumes"].is_sequence());
    }

    #[test]
    fn render_is_deterministic() {
        let template = "services:\n  dev:\n    volumes:\n";
        let mounts = [
            entry("/p/m/root/a", "/root/a", MountMode::Rw),
            entry("/p/m/root/b", "/root/b", MountMode::Ro),
        ];
        assert_eq!(
            OverrideDocument::render(Some(template), "dev", &mounts).unwrap(),
            OverrideDocument::render(Some(template), "dev", &mounts).unwrap()
        );
    }

    #[test]
    fn non_mapping_template_rejected() {
        let err = OverrideDocument::from_template(Some("- a\n- b\n"), "dev").unwrap_err();
        assert!(matches!(err, DevmountError::InvalidTemplate { .. }));

        let err = OverrideDocument::from_template(Some("services: [dev]\n"), "dev").unwrap_err();
        assert!(matches!(err, DevmountError::InvalidTemplate { .. }));

        let err =
            OverrideDocument::from_template(Some("services:\n  dev:\n    volumes: x\n"), "dev")
                .unwrap_err();
        assert!(matches!(err, DevmountError::InvalidTemplate { .. }));
    }
}
