//! XDPath building and parsing
//!
//! An XDPath addresses an object on a hypervisor connection, for example
//! `XDHyp:\HostingUnits\pool\rg.resourcegroup\disk.manageddisk`. Every segment below the
//! hosting unit is `<name>.<kind>`, where the kind is the text after the last dot.

use std::fmt;

pub const HOSTING_UNITS_PREFIX: &str = r"XDHyp:\HostingUnits\";
const SEPARATOR: char = '\\';

pub mod kind {
    pub const RESOURCE_GROUP: &str = "resourcegroup";
    pub const MANAGED_DISK: &str = "manageddisk";
    pub const STORAGE_ACCOUNT: &str = "storageaccount";
    pub const FOLDER: &str = "folder";
    pub const VHD: &str = "vhd";
    pub const GALLERY: &str = "gallery";
    pub const IMAGE_DEFINITION: &str = "imagedefinition";
    pub const IMAGE_VERSION: &str = "imageversion";
    pub const VM: &str = "vm";
    pub const SNAPSHOT: &str = "snapshot";
    pub const AMI: &str = "ami";
    pub const TEMPLATE: &str = "template";
    pub const NETWORK: &str = "network";
    pub const TEMPLATE_SPEC: &str = "templatespec";
    pub const TEMPLATE_SPEC_VERSION: &str = "templatespecversion";
    pub const SERVICE_OFFERING: &str = "serviceoffering";
    pub const SHARED_SUBSCRIPTION: &str = "sharedsubscription";
}

/// `XDHyp:\HostingUnits\<unit>`
pub fn hosting_unit_path(unit: &str) -> String {
    format!("{}{}", HOSTING_UNITS_PREFIX, unit)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub kind: Option<String>,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.rsplit_once('.') {
            Some((name, kind)) if !name.is_empty() && !kind.is_empty() => Segment {
                name: name.to_string(),
                kind: Some(kind.to_string()),
            },
            _ => Segment {
                name: raw.to_string(),
                kind: None,
            },
        }
    }

    /// Kinds compare case-insensitively; the original spelling is kept for display
    pub fn is(&self, kind: &str) -> bool {
        self.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case(kind))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{}.{}", self.name, kind),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XdPath {
    pub hosting_unit: Option<String>,
    pub segments: Vec<Segment>,
}

impl XdPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn under_hosting_unit(unit: &str) -> Self {
        Self {
            hosting_unit: Some(unit.to_string()),
            segments: Vec::new(),
        }
    }

    /// Appends `\<name>.<kind>`
    pub fn join(mut self, name: &str, kind: &str) -> Self {
        self.segments.push(Segment {
            name: name.to_string(),
            kind: Some(kind.to_string()),
        });
        self
    }

    /// Appends a segment that carries its own suffix, such as a `.vhd` blob name
    pub fn join_raw(mut self, segment: &str) -> Self {
        self.segments.push(Segment::parse(segment));
        self
    }

    pub fn parse(path: &str) -> Self {
        let (hosting_unit, rest) = match path.strip_prefix(HOSTING_UNITS_PREFIX) {
            Some(rest) => match rest.split_once(SEPARATOR) {
                Some((unit, tail)) => (Some(unit.to_string()), tail),
                None => (Some(rest.to_string()), ""),
            },
            None => (None, path),
        };

        let segments = rest
            .split(SEPARATOR)
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();

        Self {
            hosting_unit,
            segments,
        }
    }

    pub fn find(&self, kind: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.is(kind))
    }

    pub fn find_all(&self, kind: &str) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.is(kind)).collect()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Path relative to the hosting unit, without the `XDHyp:` prefix
    pub fn relative(&self) -> String {
        self.segments
            .iter()
            .map(Segment::to_string)
            .collect::<Vec<_>>()
            .join("\\")
    }
}

impl fmt::Display for XdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relative = self.relative();
        match (&self.hosting_unit, relative.is_empty()) {
            (Some(unit), true) => f.write_str(&hosting_unit_path(unit)),
            (Some(unit), false) => write!(f, "{}\\{}", hosting_unit_path(unit), relative),
            (None, _) => f.write_str(&relative),
        }
    }
}

/// `<rg>.resourcegroup\<disk>.manageddisk`
pub fn azure_managed_disk(resource_group: &str, disk: &str) -> XdPath {
    XdPath::new()
        .join(resource_group, kind::RESOURCE_GROUP)
        .join(disk, kind::MANAGED_DISK)
}

/// `<rg>.resourcegroup\<sa>.storageaccount\<container>.folder\<blob>`
pub fn azure_vhd(resource_group: &str, storage_account: &str, container: &str, blob: &str) -> XdPath {
    XdPath::new()
        .join(resource_group, kind::RESOURCE_GROUP)
        .join(storage_account, kind::STORAGE_ACCOUNT)
        .join(container, kind::FOLDER)
        .join_raw(blob)
}

/// `<rg>.resourcegroup\<gallery>.gallery\<def>.imagedefinition\<ver>.imageversion`
pub fn azure_gallery_image(resource_group: &str, gallery: &str, definition: &str, version: &str) -> XdPath {
    XdPath::new()
        .join(resource_group, kind::RESOURCE_GROUP)
        .join(gallery, kind::GALLERY)
        .join(definition, kind::IMAGE_DEFINITION)
        .join(version, kind::IMAGE_VERSION)
}

/// `<rg>.resourcegroup\<spec>.templatespec\<ver>.templatespecversion`
pub fn azure_template_spec(resource_group: &str, spec: &str, version: &str) -> XdPath {
    XdPath::new()
        .join(resource_group, kind::RESOURCE_GROUP)
        .join(spec, kind::TEMPLATE_SPEC)
        .join(version, kind::TEMPLATE_SPEC_VERSION)
}

/// `<rg>.resourcegroup\<vm>.vm`, or `<vm>.vm` when there is no resource group
pub fn machine_profile_vm(resource_group: Option<&str>, vm: &str) -> XdPath {
    let path = match resource_group {
        Some(rg) if !rg.is_empty() => XdPath::new().join(rg, kind::RESOURCE_GROUP),
        _ => XdPath::new(),
    };
    path.join(vm, kind::VM)
}

/// `<vm>.vm\<s1>.snapshot\<s2>.snapshot` from `s1/s2`
pub fn snapshot_chain(vm: &str, snapshots: Option<&str>) -> XdPath {
    let mut path = XdPath::new().join(vm, kind::VM);
    for snapshot in snapshots
        .unwrap_or_default()
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        path = path.join(snapshot, kind::SNAPSHOT);
    }
    path
}

/// `<name> (<ami-id>).ami`
pub fn aws_ami(name: &str, ami_id: &str) -> XdPath {
    XdPath::new().join(&format!("{} ({})", name, ami_id), kind::AMI)
}

/// `<name>.template`
pub fn nutanix_template(name: &str) -> XdPath {
    XdPath::new().join(name, kind::TEMPLATE)
}

/// `<parent>\<name>.network`
pub fn network(parent: &str, name: &str) -> String {
    format!(
        "{}\\{}.{}",
        parent.trim_end_matches(SEPARATOR),
        name,
        kind::NETWORK
    )
}

/// Joins a relative path onto a hosting unit, leaving absolute paths untouched
pub fn absolute(hosting_unit: &str, path: &XdPath) -> String {
    match path.hosting_unit {
        Some(_) => path.to_string(),
        None => XdPath {
            hosting_unit: Some(hosting_unit.to_string()),
            segments: path.segments.clone(),
        }
        .to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedDisk {
    pub resource_group: String,
    pub disk: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vhd {
    pub resource_group: String,
    pub storage_account: String,
    pub container: String,
    pub blob: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub resource_group: String,
    pub gallery: String,
    pub definition: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotChain {
    pub vm: String,
    /// Slash-separated, e.g. `base/patched`
    pub snapshots: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ami {
    pub name: String,
    pub id: String,
}

impl XdPath {
    fn name_of(&self, kind: &str) -> Option<String> {
        self.find(kind).map(|s| s.name.clone())
    }

    pub fn as_managed_disk(&self) -> Option<ManagedDisk> {
        Some(ManagedDisk {
            resource_group: self.name_of(kind::RESOURCE_GROUP)?,
            disk: self.name_of(kind::MANAGED_DISK)?,
        })
    }

    pub fn as_vhd(&self) -> Option<Vhd> {
        let blob = self.last().filter(|s| s.is(kind::VHD))?;
        Some(Vhd {
            resource_group: self.name_of(kind::RESOURCE_GROUP)?,
            storage_account: self.name_of(kind::STORAGE_ACCOUNT)?,
            container: self.name_of(kind::FOLDER)?,
            blob: blob.to_string(),
        })
    }

    pub fn as_gallery_image(&self) -> Option<GalleryImage> {
        Some(GalleryImage {
            resource_group: self.name_of(kind::RESOURCE_GROUP)?,
            gallery: self.name_of(kind::GALLERY)?,
            definition: self.name_of(kind::IMAGE_DEFINITION)?,
            version: self.name_of(kind::IMAGE_VERSION)?,
        })
    }

    pub fn as_snapshot_chain(&self) -> Option<SnapshotChain> {
        let vm = self.name_of(kind::VM)?;
        let snapshots = self
            .find_all(kind::SNAPSHOT)
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>();
        Some(SnapshotChain {
            vm,
            snapshots: (!snapshots.is_empty()).then(|| snapshots.join("/")),
        })
    }

    pub fn as_ami(&self) -> Option<Ami> {
        let segment = self.find(kind::AMI)?;
        let (name, rest) = segment.name.rsplit_once(" (")?;
        let id = rest.strip_suffix(')')?;
        Some(Ami {
            name: name.to_string(),
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosting_unit_path() {
        assert_eq!(hosting_unit_path("pool"), r"XDHyp:\HostingUnits\pool");
        assert_eq!(
            XdPath::under_hosting_unit("pool").to_string(),
            r"XDHyp:\HostingUnits\pool"
        );
    }

    #[test]
    fn test_managed_disk_round_trip() {
        let path = azure_managed_disk("images-rg", "gold-disk");
        assert_eq!(path.to_string(), r"images-rg.resourcegroup\gold-disk.manageddisk");

        let parsed = XdPath::parse(&absolute("pool", &path));
        assert_eq!(parsed.hosting_unit.as_deref(), Some("pool"));
        assert_eq!(
            parsed.as_managed_disk(),
            Some(ManagedDisk {
                resource_group: "images-rg".to_string(),
                disk: "gold-disk".to_string()
            })
        );
        assert!(parsed.as_gallery_image().is_none());
    }

    #[test]
    fn test_vhd_keeps_suffix() {
        let path = azure_vhd("rg", "sa", "vhds", "master.vhd");
        assert_eq!(
            path.to_string(),
            r"rg.resourcegroup\sa.storageaccount\vhds.folder\master.vhd"
        );
        let vhd = XdPath::parse(&path.to_string()).as_vhd().unwrap();
        assert_eq!(vhd.blob, "master.vhd");
        assert_eq!(vhd.container, "vhds");
    }

    #[test]
    fn test_segment_kind_keeps_its_case() {
        let path = azure_vhd("rg", "sa", "vhds", "Image.VHD");
        assert_eq!(
            path.to_string(),
            r"rg.resourcegroup\sa.storageaccount\vhds.folder\Image.VHD"
        );
        let vhd = XdPath::parse(&path.to_string()).as_vhd().unwrap();
        assert_eq!(vhd.blob, "Image.VHD");

        let parsed = XdPath::parse(r"XDHyp:\HostingUnits\pool\RG.ResourceGroup\Disk.ManagedDisk");
        assert_eq!(parsed.relative(), r"RG.ResourceGroup\Disk.ManagedDisk");
        assert_eq!(parsed.as_managed_disk().unwrap().disk, "Disk");
    }

    #[test]
    fn test_gallery_image() {
        let path = azure_gallery_image("rg", "gal", "win11", "1.0.0");
        assert_eq!(
            path.to_string(),
            r"rg.resourcegroup\gal.gallery\win11.imagedefinition\1.0.0.imageversion"
        );
        let image = XdPath::parse(&path.to_string()).as_gallery_image().unwrap();
        assert_eq!(image.version, "1.0.0");
        assert_eq!(image.definition, "win11");
    }

    #[test]
    fn test_snapshot_chain() {
        let path = snapshot_chain("gold", Some("base/patched"));
        assert_eq!(path.to_string(), r"gold.vm\base.snapshot\patched.snapshot");

        let chain = XdPath::parse(&path.to_string()).as_snapshot_chain().unwrap();
        assert_eq!(chain.vm, "gold");
        assert_eq!(chain.snapshots.as_deref(), Some("base/patched"));

        let bare = XdPath::parse(&snapshot_chain("gold", None).to_string())
            .as_snapshot_chain()
            .unwrap();
        assert_eq!(bare.snapshots, None);
    }

    #[test]
    fn test_aws_ami() {
        let path = aws_ami("Windows 2022 (base)", "ami-0123");
        assert_eq!(path.to_string(), "Windows 2022 (base) (ami-0123).ami");

        let ami = XdPath::parse(&path.to_string()).as_ami().unwrap();
        assert_eq!(ami.name, "Windows 2022 (base)");
        assert_eq!(ami.id, "ami-0123");
    }

    #[test]
    fn test_network_and_template() {
        assert_eq!(
            network(r"XDHyp:\HostingUnits\pool\vnet.virtualprivatecloud\", "subnet-a"),
            r"XDHyp:\HostingUnits\pool\vnet.virtualprivatecloud\subnet-a.network"
        );
        assert_eq!(nutanix_template("win10").to_string(), "win10.template");
    }

    #[test]
    fn test_parse_finds_segments_and_tolerates_bare_names() {
        let parsed = XdPath::parse(r"XDHyp:\HostingUnits\pool\a.vm\s1.snapshot\noext");
        assert_eq!(parsed.find(kind::VM).unwrap().name, "a");
        assert_eq!(parsed.find_all(kind::SNAPSHOT).len(), 1);
        assert_eq!(parsed.last().unwrap().kind, None);
        assert_eq!(parsed.relative(), r"a.vm\s1.snapshot\noext");
    }

    #[test]
    fn test_machine_profile_paths() {
        assert_eq!(
            machine_profile_vm(Some("rg"), "profile").to_string(),
            r"rg.resourcegroup\profile.vm"
        );
        assert_eq!(machine_profile_vm(None, "profile").to_string(), "profile.vm");
        assert_eq!(
            azure_template_spec("rg", "spec", "1.0").to_string(),
            r"rg.resourcegroup\spec.templatespec\1.0.templatespecversion"
        );
    }
}
