//! Resolution pipeline: reads data files, resolves names, builds the recipe book.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, deserialization
//! helpers and [`load_game_data`], which turns a data directory into a
//! ready-to-use [`GameData`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use forgeline_core::config::{BoilerType, MachineConfig};
use forgeline_core::container::{FluidStack, ItemStack};
use forgeline_core::id::ItemTypeId;
use forgeline_core::material::FluidRegistry;
use forgeline_core::plant::Plant;
use forgeline_core::recipe::{Recipe, RecipeBook, RecipeMap};
use serde::de::DeserializeOwned;

use crate::schema::*;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A recipe failed validation.
    #[error("invalid recipe in {file} ({map}): {detail}")]
    InvalidRecipe {
        file: PathBuf,
        map: String,
        detail: String,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug, Clone)]
pub struct GameData {
    pub fluids: FluidRegistry,
    pub items: HashMap<String, ItemTypeId>,
    pub book: RecipeBook,
    pub config: MachineConfig,
    /// Boiler tiers by name: the built-in four plus any from data.
    pub boilers: HashMap<String, BoilerType>,
}

impl GameData {
    pub fn item(&self, name: &str) -> Option<ItemTypeId> {
        self.items.get(name).copied()
    }

    pub fn boiler(&self, name: &str) -> Option<&BoilerType> {
        self.boilers.get(name)
    }

    /// An empty plant running on this data.
    pub fn into_plant(self) -> Plant {
        Plant::new(self.book, self.config, self.fluids)
    }
}

/// Load a data directory.
///
/// `items` and `recipes` are required. `fluids`, `fuels` and `machines`
/// are optional and default to the built-in fluids, no solid fuels, and
/// default configuration respectively.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let fluids = load_fluids(dir)?;
    let (items, containers) = load_items(dir)?;
    let mut book = load_recipes(dir, &items, &fluids)?;

    if let Some(path) = find_data_file(dir, "fuels")? {
        let fuels: Vec<FuelData> = deserialize_list(&path, "fuels")?;
        for fuel in &fuels {
            let item = *resolve_name(&items, &fuel.item, &path, "item")?;
            book.solid_fuels.set_burn_time(item, fuel.burn_time);
        }
    }
    for item in containers {
        book.solid_fuels.mark_fluid_container(item);
    }

    let machines: MachinesFile = match find_data_file(dir, "machines")? {
        Some(path) => deserialize_file(&path)?,
        None => MachinesFile::default(),
    };
    let mut boilers: HashMap<String, BoilerType> = [
        BoilerType::bronze(),
        BoilerType::steel(),
        BoilerType::titanium(),
        BoilerType::tungstensteel(),
    ]
    .into_iter()
    .map(|b| (b.name.clone(), b))
    .collect();
    for tier in machines.boilers {
        boilers.insert(tier.name.clone(), tier);
    }

    log::debug!(
        "loaded {} fluids, {} items, {} recipe maps from {}",
        fluids.len(),
        items.len(),
        book.machines.len(),
        dir.display()
    );

    Ok(GameData {
        fluids,
        items,
        book,
        config: machines.config,
        boilers,
    })
}

fn load_fluids(dir: &Path) -> Result<FluidRegistry, DataLoadError> {
    let mut registry = FluidRegistry::new();
    let Some(path) = find_data_file(dir, "fluids")? else {
        return Ok(registry);
    };
    let list: Vec<FluidData> = deserialize_list(&path, "fluids")?;
    let mut seen: HashMap<String, ()> = HashMap::new();
    for fluid in &list {
        check_duplicate(&seen, &fluid.name, &path)?;
        seen.insert(fluid.name.clone(), ());
        registry.register(&fluid.name);
    }
    Ok(registry)
}

/// Item ids by name, plus the ids flagged as fluid containers.
fn load_items(dir: &Path) -> Result<(HashMap<String, ItemTypeId>, Vec<ItemTypeId>), DataLoadError> {
    let path = require_data_file(dir, "items")?;
    let list: Vec<ItemData> = deserialize_list(&path, "items")?;
    let mut items = HashMap::new();
    let mut containers = Vec::new();
    for (i, item) in list.iter().enumerate() {
        check_duplicate(&items, &item.name, &path)?;
        let id = ItemTypeId(u32::try_from(i).unwrap_or(u32::MAX));
        items.insert(item.name.clone(), id);
        if item.fluid_container {
            containers.push(id);
        }
    }
    Ok((items, containers))
}

fn load_recipes(
    dir: &Path,
    items: &HashMap<String, ItemTypeId>,
    fluids: &FluidRegistry,
) -> Result<RecipeBook, DataLoadError> {
    let path = require_data_file(dir, "recipes")?;
    let file: RecipesFile = deserialize_file(&path)?;
    let mut book = RecipeBook::new();

    for map_data in &file.machines {
        check_duplicate(&book.machines, &map_data.name, &path)?;
        let mut map = RecipeMap::new(&map_data.name);
        fill_map(&mut map, &map_data.recipes, items, fluids, &path)?;
        book.insert_map(map);
    }
    fill_map(
        &mut book.combustion_fuels,
        &file.combustion_fuels,
        items,
        fluids,
        &path,
    )?;
    fill_map(
        &mut book.semi_fluid_fuels,
        &file.semi_fluid_fuels,
        items,
        fluids,
        &path,
    )?;
    Ok(book)
}

fn fill_map(
    map: &mut RecipeMap,
    recipes: &[RecipeData],
    items: &HashMap<String, ItemTypeId>,
    fluids: &FluidRegistry,
    file: &Path,
) -> Result<(), DataLoadError> {
    for data in recipes {
        let recipe = resolve_recipe(data, items, fluids, file)?;
        map.add(recipe).map_err(|e| DataLoadError::InvalidRecipe {
            file: file.to_path_buf(),
            map: map.name.clone(),
            detail: e.to_string(),
        })?;
    }
    Ok(())
}

fn resolve_recipe(
    data: &RecipeData,
    items: &HashMap<String, ItemTypeId>,
    fluids: &FluidRegistry,
    file: &Path,
) -> Result<Recipe, DataLoadError> {
    let item_stacks = |list: &[StackData]| -> Result<Vec<ItemStack>, DataLoadError> {
        list.iter()
            .map(|s| -> Result<ItemStack, DataLoadError> {
                let id = *resolve_name(items, s.name(), file, "item")?;
                Ok(ItemStack::new(id, s.amount()))
            })
            .collect()
    };
    let fluid_stacks = |list: &[StackData]| -> Result<Vec<FluidStack>, DataLoadError> {
        list.iter()
            .map(|s| -> Result<FluidStack, DataLoadError> {
                let id = fluids
                    .resolve(s.name())
                    .map_err(|_| DataLoadError::UnresolvedRef {
                        file: file.to_path_buf(),
                        name: s.name().to_string(),
                        expected_kind: "fluid",
                    })?;
                Ok(FluidStack::new(id, s.amount()))
            })
            .collect()
    };

    Ok(Recipe {
        item_inputs: item_stacks(&data.item_inputs)?,
        fluid_inputs: fluid_stacks(&data.fluid_inputs)?,
        item_outputs: item_stacks(&data.item_outputs)?,
        fluid_outputs: fluid_stacks(&data.fluid_outputs)?,
        duration: data.duration,
        eut: data.eut,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
