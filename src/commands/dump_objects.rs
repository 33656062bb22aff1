use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::{
    assets::{AssetsFile, ObjectRef},
    serialization::{DeserializeOptions, SchemaCatalog},
};

fn dump_object(
    object: &ObjectRef,
    catalog: &SchemaCatalog,
    options: DeserializeOptions,
    output_folder: &Path,
) -> Result<()> {
    let decoded = object
        .deserialize(catalog, options)
        .context("Failed to deserialize object")?;

    let out_filename = output_folder.join(format!(
        "{}_{}.json",
        object.info().type_string(),
        object.path_id()
    ));
    let file = File::create(&out_filename)
        .with_context(|| format!("Failed to create file {out_filename:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &decoded)
        .context("Failed to serialise object")?;

    Ok(())
}

/// Decode every object whose class has a schema and write each one out as JSON. Returns how
/// many were written.
pub fn dump_objects(
    assets: &AssetsFile,
    catalog: &SchemaCatalog,
    options: DeserializeOptions,
    output_folder: &Path,
) -> Result<usize> {
    fs::create_dir_all(output_folder).context("Failed to create output folder")?;

    let mut dumped = 0;
    for object in assets.objects() {
        if catalog.for_class(object.info().class_id).is_err() {
            debug!(
                path_id = object.path_id(),
                class = %object.info().type_string(),
                "No schema, skipping"
            );
            continue;
        }

        match dump_object(&object, catalog, options, output_folder) {
            Ok(()) => dumped += 1,
            Err(e) => warn!(path_id = object.path_id(), "Failed to dump object: {e:?}"),
        }
    }

    Ok(dumped)
}
