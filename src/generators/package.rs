//! In-memory metadata deploy package for Apex triggers.
//!
//! Triggers cannot be PATCHed reliably through the Tooling API, so toggling
//! one means redeploying it: a `.trigger` body file plus a `-meta.xml`
//! descriptor carrying the desired status, wrapped in a `package.xml`
//! manifest and zipped for the asynchronous Metadata API deploy.

use crate::Result;
use std::io::Write;

const METADATA_XMLNS: &str = "http://soap.sforce.com/2006/04/metadata";

/// One trigger to include in the package.
#[derive(Debug, Clone)]
pub struct TriggerMember {
    /// Trigger name (file name stem and package.xml member).
    pub name: String,
    /// Apex source body.
    pub body: String,
    /// Trigger API version, e.g. `58.0`.
    pub api_version: String,
    /// Desired status after deploy.
    pub active: bool,
}

/// A single-package trigger deployment.
#[derive(Debug, Clone)]
pub struct TriggerPackage {
    api_version: String,
    members: Vec<TriggerMember>,
}

impl TriggerPackage {
    /// Create an empty package targeting the org's API version.
    pub fn new(api_version: &str) -> Self {
        Self {
            api_version: api_version.to_string(),
            members: Vec::new(),
        }
    }

    pub fn add_trigger(&mut self, member: TriggerMember) {
        self.members.push(member);
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name.as_str()).collect()
    }

    /// The `package.xml` manifest enumerating all included triggers.
    pub fn package_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!("<Package xmlns=\"{}\">\n", METADATA_XMLNS));
        xml.push_str("    <types>\n");
        for member in &self.members {
            xml.push_str(&format!("        <members>{}</members>\n", member.name));
        }
        xml.push_str("        <name>ApexTrigger</name>\n");
        xml.push_str("    </types>\n");
        xml.push_str(&format!("    <version>{}</version>\n", self.api_version));
        xml.push_str("</Package>\n");
        xml
    }

    /// The `-meta.xml` descriptor for one trigger, carrying its API version
    /// and desired status.
    pub fn trigger_meta_xml(member: &TriggerMember) -> String {
        let status = if member.active { "Active" } else { "Inactive" };
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <ApexTrigger xmlns=\"{}\">\n\
             \x20   <apiVersion>{}</apiVersion>\n\
             \x20   <status>{}</status>\n\
             </ApexTrigger>\n",
            METADATA_XMLNS, member.api_version, status
        )
    }

    /// Assemble the deployable zip in memory.
    pub fn build_zip(&self) -> Result<Vec<u8>> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);

            writer.start_file("package.xml", options)?;
            writer.write_all(self.package_xml().as_bytes())?;

            for member in &self.members {
                writer.start_file(format!("triggers/{}.trigger", member.name), options)?;
                writer.write_all(member.body.as_bytes())?;

                writer.start_file(
                    format!("triggers/{}.trigger-meta.xml", member.name),
                    options,
                )?;
                writer.write_all(Self::trigger_meta_xml(member).as_bytes())?;
            }

            writer.finish()?;
        }
        Ok(buffer.into_inner())
    }
}
