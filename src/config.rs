use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_ITEMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Department {
    Men,
    Women,
    Kids,
}

impl Department {
    pub const ALL: [Department; 3] = [Department::Men, Department::Women, Department::Kids];
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Department::Men => "Mens",
            Department::Women => "Womens",
            Department::Kids => "Kids",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartmentFilter {
    All,
    Only(Department),
}

impl DepartmentFilter {
    /// First set flag wins, in men / women / kids order.
    pub fn from_flags(men: bool, women: bool, kids: bool) -> Self {
        if men {
            DepartmentFilter::Only(Department::Men)
        } else if women {
            DepartmentFilter::Only(Department::Women)
        } else if kids {
            DepartmentFilter::Only(Department::Kids)
        } else {
            DepartmentFilter::All
        }
    }

    pub fn departments(&self) -> Vec<Department> {
        match self {
            DepartmentFilter::All => Department::ALL.to_vec(),
            DepartmentFilter::Only(d) => vec![*d],
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DepartmentFilter::All => "Will scrape Mens, Womens and Kids departments.".to_string(),
            DepartmentFilter::Only(d) => format!("Will scrape only the {} department.", d),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    Both,
    LocalOnly,
    CloudOnly,
}

impl PersistenceMode {
    /// `--cloud` takes precedence when both flags are given.
    pub fn from_flags(locally: bool, cloud: bool) -> Self {
        if cloud {
            PersistenceMode::CloudOnly
        } else if locally {
            PersistenceMode::LocalOnly
        } else {
            PersistenceMode::Both
        }
    }

    pub fn writes_local(self) -> bool {
        self != PersistenceMode::CloudOnly
    }

    pub fn writes_cloud(self) -> bool {
        self != PersistenceMode::LocalOnly
    }

    pub fn writes_database(self) -> bool {
        self == PersistenceMode::Both
    }

    /// Namespaces and tables are prepared whenever the run is not local-only.
    pub fn prepares_schema(self) -> bool {
        self != PersistenceMode::LocalOnly
    }

    pub fn describe(self) -> &'static str {
        match self {
            PersistenceMode::Both => "Documents will be saved both locally and on the cloud.",
            PersistenceMode::LocalOnly => "Documents will save locally only.",
            PersistenceMode::CloudOnly => {
                "Documents will not save locally; will save to object storage only."
            }
        }
    }
}

/// Run-wide settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub departments: DepartmentFilter,
    pub mode: PersistenceMode,
    pub max_items: usize,
    pub raw_data_root: PathBuf,
    pub bucket: String,
    pub prefix_keys: bool,
    pub delay: Duration,
    pub poll_interval: Duration,
    pub fail_fast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            departments: DepartmentFilter::All,
            mode: PersistenceMode::Both,
            max_items: DEFAULT_MAX_ITEMS,
            raw_data_root: PathBuf::from("data/raw_data"),
            bucket: "retail-scraper".to_string(),
            prefix_keys: false,
            delay: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            fail_fast: false,
        }
    }
}
