use std::path::PathBuf;

use super::InstallKind;
use crate::version::Version;

/// Outcome of a successful install.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub kind: InstallKind,
    pub version: Version,
    pub product_name: String,
    /// The assembled tree
    pub final_dir: PathBuf,
    /// `application.properties` of the assembled tree
    pub config_file: PathBuf,
    /// Where the branding logo was copied, if it was
    pub brand_dest: Option<PathBuf>,
    pub ownership_repaired: bool,
    /// URLs the archives were actually downloaded from
    pub sources: Vec<String>,
    /// Non-fatal problems met during the run
    pub warnings: Vec<String>,
}

impl InstallReport {
    /// Suggested database name, also used as a version marker
    pub fn database_name(&self) -> String {
        format!("{}-{}", self.product_name, self.version)
    }

    pub fn folder_name(&self) -> String {
        self.final_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Post-install guidance, as paragraphs meant to be shown one after the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    blocks: Vec<Vec<String>>,
}

impl Advisory {
    pub fn for_report(report: &InstallReport) -> Self {
        let config_file = report.config_file.display();
        let mut blocks = Vec::new();

        if let Some(brand_dest) = &report.brand_dest {
            let brand_name = brand_dest
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            blocks.push(vec![
                format!("A personalized logo has been copied to {}.", brand_dest.display()),
                format!(
                    "Please edit the \"application.logo\" entry in {} to apply this new logo.",
                    config_file
                ),
                "Typically, the entry will be set (by default) to \"img/axelor.png\".".to_string(),
                format!("Simply change this to \"img/{}\".", brand_name),
            ]);
        }

        blocks.push(vec![format!(
            "In order to get {} working, the {} file needs various database-related changes.",
            report.product_name, config_file
        )]);

        blocks.push(vec![
            "More specifically, the name of the database it is going to use and the account that owns the database need to be entered.".to_string(),
            format!(
                "No database is created for you, but please ensure that no database used for this version was used by a previous version of {}.",
                report.product_name
            ),
            "This is to ensure a more reliable experience.".to_string(),
            "To copy all the information from a previous instance, please use its built-in backup and restore feature.".to_string(),
        ]);

        blocks.push(vec![
            "If a database hasn't been created already, it is recommended to name it after the specific version number you are running.".to_string(),
            format!(
                "For example, {} would make a great database name.",
                report.database_name()
            ),
            "This will make life easier in case it is necessary to revert to a previous version.".to_string(),
            "In that case, there would be no need to worry about conflicts due to a newer version updating the database.".to_string(),
        ]);

        if report.kind == InstallKind::Binary {
            blocks.push(vec![format!(
                "In order to avoid having to specify {} while typing in the URL or IP address to access the application, please rename the folder to \"ROOT\".",
                report.folder_name()
            )]);
        }

        Self { blocks }
    }

    pub fn blocks(&self) -> &[Vec<String>] {
        &self.blocks
    }

    pub fn mentions(&self, needle: &str) -> bool {
        self.blocks.iter().flatten().any(|line| line.contains(needle))
    }
}
