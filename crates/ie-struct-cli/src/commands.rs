use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use ie_struct::limits::EFF_SIGNATURE;
use ie_struct::{
    EffectVersion, GameConfig, StructKind, Tree, Variable, convert_effect, convert_effect_table,
};
use tracing::info;

/// Reads `path` as `kind`, or as an `EFF` file when it carries the signature.
fn load(path: &Path, kind: Option<StructKind>, config: &GameConfig) -> Result<Tree> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let kind = match kind {
        Some(kind) => kind,
        None if data.starts_with(EFF_SIGNATURE) => StructKind::EffFile,
        None => bail!("cannot detect the record kind of {}; pass --kind", path.display()),
    };
    let tree = Tree::decode(kind, &data, config)
        .with_context(|| format!("failed to decode {} as {}", path.display(), kind.label()))?;
    info!(path = %path.display(), kind = kind.label(), size = tree.size(), "loaded");
    Ok(tree)
}

fn save(path: &Path, tree: &Tree) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let written = tree
        .write(BufWriter::new(file))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = written, "saved");
    Ok(())
}

pub fn dump(path: &Path, kind: Option<StructKind>, config: &GameConfig) -> Result<()> {
    let tree = load(path, kind, config)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{} ({} bytes)", tree.kind().label(), tree.size())?;
    write!(out, "{}", tree.dump())?;
    Ok(())
}

pub fn convert(
    input: &Path,
    output: &Path,
    kind: Option<StructKind>,
    target: EffectVersion,
    config: &GameConfig,
) -> Result<()> {
    let mut tree = load(input, kind, config)?;
    let converted = match tree.kind() {
        StructKind::EffectTable => {
            let root = tree.root();
            let count = convert_effect_table(&mut tree, root, target)?;
            info!(count, "converted effect table");
            tree
        }
        // EFF bodies are always extended; only a compact target drops the header.
        StructKind::EffFile if target == EffectVersion::Extended => tree,
        StructKind::EffFile => {
            let body = tree
                .lookup("Effect")
                .context("EFF file has no effect body")?;
            convert_effect(&tree, body, target)?
        }
        StructKind::EffectV1 | StructKind::EffectV2 => convert_effect(&tree, tree.root(), target)?,
        other => bail!("{} records cannot be converted", other.label()),
    };
    save(output, &converted)
}

pub fn variables(path: &Path, config: &GameConfig) -> Result<()> {
    let tree = load(path, Some(StructKind::VariableTable), config)?;
    let mut out = io::stdout().lock();
    for var in tree.root_ref().children().filter_map(Variable::new) {
        let ty = var.var_type().map_or("unknown", |t| t.label());
        match var.value() {
            Some(value) => writeln!(out, "{:<32} {:<16} {}", var.name(), ty, value)?,
            None => writeln!(out, "{:<32} {:<16} (tag {})", var.name(), ty, var.type_tag())?,
        }
    }
    Ok(())
}
