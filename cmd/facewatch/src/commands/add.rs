use std::path::PathBuf;

use clap::Args;
use facewatch_gallery::{GalleryError, Label};

use super::util::Session;
use crate::replay::SidecarLoader;
use crate::Cli;

/// Enroll the single face in an image under NAME.
///
/// Replaces any descriptor already stored for NAME.
#[derive(Args)]
pub struct AddCommand {
    /// Identity name
    pub name: String,

    /// Image file with exactly one face
    pub image: PathBuf,
}

impl AddCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (session, report) = Session::open(cli)?;
        session.print_startup(&report);

        let label = Label::new(&self.name)?;
        match session
            .enroller
            .enroll_file(label, &self.image, &SidecarLoader)
        {
            Ok(d) => {
                println!(
                    "Added {} from {} ({} dims)",
                    d.label(),
                    self.image.display(),
                    d.dimension()
                );
                Ok(())
            }
            Err(GalleryError::NoFaceFound) => {
                anyhow::bail!("No face found in {}", self.image.display())
            }
            Err(GalleryError::AmbiguousFace { count }) => anyhow::bail!(
                "{} faces found in {}, expected exactly one",
                count,
                self.image.display()
            ),
            Err(e) => Err(e.into()),
        }
    }
}
