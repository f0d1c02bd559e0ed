use data::project::Project;

use crate::{ConsoleError, server_url};

/// What the project page shows a developer wiring up a client.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDetailsView {
    pub project: Project,
    pub upload_url: String,
    pub electron_snippet: String,
}

impl ProjectDetailsView {
    pub fn new(base_url: &str, project: Project) -> Result<Self, ConsoleError> {
        let upload_url = upload_url(base_url, &project)?;
        Ok(Self {
            electron_snippet: electron_snippet(&upload_url),
            upload_url,
            project,
        })
    }
}

/// `{base}/crash-logs/projects/{id}`
pub fn upload_url(base_url: &str, project: &Project) -> Result<String, ConsoleError> {
    let id = project.id.to_string();
    Ok(server_url(base_url, &["crash-logs", "projects", &id])?.to_string())
}

pub fn electron_snippet(upload_url: &str) -> String {
    format!(
        "\nconst {{crashReporter}} = require('electron')\n\n\
         crashReporter.start({{\n\
         \tproductName: 'YourName',\n\
         \tcompanyName: 'YourCompany',\n\
         \tsubmitURL: '{upload_url}',\n\
         \tautoSubmit: true\n\
         }})\n"
    )
}
