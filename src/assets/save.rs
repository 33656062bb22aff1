use std::{fs, ops::Range, path::Path};

use tracing::debug;

use super::AssetsFile;
use crate::{
    error::{Error, Result},
    io::{align_up, Endianness, Writer},
};

impl AssetsFile {
    /// Rewrite the file with replaced payloads, fixing up the object index and total size.
    ///
    /// Header and metadata bytes are copied verbatim, objects are laid out in index order with
    /// 4-byte alignment between them. Metadata stored after the objects (format < 9) is moved to
    /// follow the rewritten objects.
    pub fn save(&self) -> Result<Vec<u8>> {
        let format = self.header.format;
        let data_offset = usize::try_from(self.header.data_offset)
            .ok()
            .filter(|offset| *offset <= self.data.len())
            .ok_or(Error::UnexpectedEof {
                offset: self.data.len(),
                wanted: self.header.data_offset.max(0) as usize,
            })?;

        let trailing_metadata = self.trailing_metadata(data_offset)?;

        let mut writer = Writer::with_capacity(self.data.len(), self.header.endian);
        writer.write_bytes(&self.data[..data_offset]);

        let mut placements = Vec::with_capacity(self.objects.len());
        for object in self.objects() {
            let offset = writer.position() - data_offset;
            let size = match self.replacements.get(&object.path_id()) {
                Some(replacement) => {
                    writer.write_bytes(replacement);
                    replacement.len()
                }
                None => {
                    let payload = object.data()?;
                    writer.write_bytes(&payload);
                    payload.len()
                }
            };
            writer.align(4);

            let size = u32::try_from(size).map_err(|_| {
                Error::invalid(offset, format!("Object of {size} bytes is too large"))
                    .in_object(object.path_id())
            })?;
            placements.push((offset, size));
        }

        // Before format 9 the metadata trails the objects, so it moves with them
        let index_offset = match trailing_metadata {
            Some(metadata) => {
                let start = writer.position();
                writer.write_bytes(&self.data[metadata.clone()]);
                start + (self.object_index_offset - metadata.start)
            }
            None => self.object_index_offset,
        };
        let total_size = writer.position();

        // Second pass: patch the index now that every offset is known
        writer.seek(index_offset)?;
        for (offset, size) in placements {
            let path_id_width = if format >= 14 {
                writer.seek(align_up(writer.position(), 4))?;
                8
            } else if self.long_object_ids {
                8
            } else {
                4
            };
            writer.skip(path_id_width)?;

            if format >= 22 {
                writer.write_i64(offset as i64);
            } else {
                writer.write_u32(offset as u32);
            }
            writer.write_u32(size);

            // Type ID
            let mut rest = 4;
            if format < 16 {
                // Class ID and destroyed flag
                rest += 4;
            }
            if format == 15 || format == 16 {
                rest += 1;
            }
            writer.skip(rest)?;
        }

        // Header fields are always big-endian
        writer.endian = Endianness::Big;
        if format >= 22 {
            writer.seek(0x18)?;
            writer.write_i64(total_size as i64);
        } else {
            writer.seek(4)?;
            writer.write_u32(total_size as u32);
        }

        debug!(
            objects = self.objects.len(),
            replaced = self.replacements.len(),
            total_size,
            "Rewrote assets file"
        );

        Ok(writer.into_inner())
    }

    /// Byte range of metadata stored after the object data, for formats before 9
    fn trailing_metadata(&self, data_offset: usize) -> Result<Option<Range<usize>>> {
        if self.header.format >= 9 {
            return Ok(None);
        }

        let size = self.header.metadata_size as usize;
        let range = usize::try_from(self.header.file_size)
            .ok()
            .and_then(|end| Some(end.checked_sub(size)?..end))
            .filter(|r| {
                r.start >= data_offset
                    && r.end <= self.data.len()
                    && r.contains(&self.object_index_offset)
            })
            .ok_or_else(|| {
                Error::invalid(
                    4,
                    format!(
                        "Metadata of {size} bytes doesn't end at file size {}",
                        self.header.file_size
                    ),
                )
            })?;

        Ok(Some(range))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.save()?)?;
        Ok(())
    }
}
