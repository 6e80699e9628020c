//! Human-readable listing of a reflection table.

use std::fmt::{self, Write as _};

use crate::attribs::{ResourceBucket, ResourceKind};
use crate::resources::ShaderResources;

impl ShaderResources {
    /// Multi-line summary: per-bucket counts followed by one line per
    /// resource in flat order.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_dump(&mut out);
        out
    }

    fn write_dump(&self, out: &mut impl fmt::Write) -> fmt::Result {
        use ResourceBucket as B;
        write!(
            out,
            "Shader '{}' resource stats: total resources: {}:\n\
             UBs: {}; SBs: {}; Imgs: {}; Smpl Imgs: {}; ACs: {}; Sep Imgs: {}; Sep Smpls: {}; Inpt Atchmnts: {}.\n\
             Resources:",
            self.name(),
            self.total_resources(),
            self.count(B::UniformBuffers),
            self.count(B::StorageBuffers),
            self.count(B::StorageImages),
            self.count(B::SampledImages),
            self.count(B::AtomicCounters),
            self.count(B::SeparateImages),
            self.count(B::SeparateSamplers),
            self.count(B::InputAttachments),
        )?;

        for (n, res) in self.resources().enumerate() {
            let mut full_name = format!("'{}", res.name);
            if res.array_size() > 1 {
                let _ = write!(full_name, "[{}]", res.array_size());
            }
            full_name.push('\'');

            write!(out, "\n{n:>3} {}{full_name:>32}", res.kind().label())?;
            match (res.kind(), res.paired_index()) {
                (ResourceKind::SeparateImage, Some(smp)) => {
                    write!(out, " Assigned sep sampler ind: {smp}")?
                }
                (ResourceKind::SeparateSampler, Some(img)) => {
                    write!(out, " Assigned sep image ind: {img}")?
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for ShaderResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_dump(f)
    }
}
