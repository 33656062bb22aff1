use serde::Serialize;

use crate::{io::Endianness, version::UnityVersion};

/// Engine class IDs with a known meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassId {
    GameObject = 1,
    Component = 2,
    Transform = 4,
    Material = 21,
    MeshRenderer = 23,
    Texture2D = 28,
    MeshFilter = 33,
    Mesh = 43,
    Shader = 48,
    TextAsset = 49,
    AnimationClip = 74,
    AudioClip = 83,
    Animator = 95,
    MonoBehaviour = 114,
    MonoScript = 115,
    Font = 128,
    AssetBundle = 142,
    Sprite = 213,
    RectTransform = 224,
}

impl ClassId {
    pub fn from_i32(value: i32) -> Option<Self> {
        use ClassId::*;
        let class = match value {
            1 => GameObject,
            2 => Component,
            4 => Transform,
            21 => Material,
            23 => MeshRenderer,
            28 => Texture2D,
            33 => MeshFilter,
            43 => Mesh,
            48 => Shader,
            49 => TextAsset,
            74 => AnimationClip,
            83 => AudioClip,
            95 => Animator,
            114 => MonoBehaviour,
            115 => MonoScript,
            128 => Font,
            142 => AssetBundle,
            213 => Sprite,
            224 => RectTransform,
            _ => return None,
        };

        Some(class)
    }

    pub fn name(self) -> &'static str {
        use ClassId::*;
        match self {
            GameObject => "GameObject",
            Component => "Component",
            Transform => "Transform",
            Material => "Material",
            MeshRenderer => "MeshRenderer",
            Texture2D => "Texture2D",
            MeshFilter => "MeshFilter",
            Mesh => "Mesh",
            Shader => "Shader",
            TextAsset => "TextAsset",
            AnimationClip => "AnimationClip",
            AudioClip => "AudioClip",
            Animator => "Animator",
            MonoBehaviour => "MonoBehaviour",
            MonoScript => "MonoScript",
            Font => "Font",
            AssetBundle => "AssetBundle",
            Sprite => "Sprite",
            RectTransform => "RectTransform",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetsFileHeader {
    pub metadata_size: u32,
    pub file_size: i64,
    pub format: u32,
    /// Absolute offset of the object data region
    pub data_offset: i64,
    pub endian: Endianness,
    pub engine_version: String,
    pub version: UnityVersion,
    pub platform: i32,
}

/// One entry of the object index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub path_id: i64,
    /// Relative to the header's data offset
    pub data_offset: i64,
    pub size: u32,
    pub type_id: i32,
    pub class_id: i32,
    pub is_destroyed: bool,
    pub stripped: bool,
}

impl AssetInfo {
    pub fn class(&self) -> Option<ClassId> {
        ClassId::from_i32(self.class_id)
    }

    pub fn type_string(&self) -> String {
        match self.class() {
            Some(class) => class.name().to_owned(),
            None => format!("UnknownType({})", self.class_id),
        }
    }
}

/// Script type referenced by MonoBehaviours in this file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptType {
    pub local_file_index: i32,
    pub path_id: i64,
}

/// Reference to another assets file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetReference {
    pub asset_path: String,
    pub guid: [u8; 16],
    pub kind: i32,
    pub file_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_string() {
        let mut info = AssetInfo {
            path_id: 1,
            data_offset: 0,
            size: 0,
            type_id: 0,
            class_id: 114,
            is_destroyed: false,
            stripped: false,
        };
        assert_eq!(info.class(), Some(ClassId::MonoBehaviour));
        assert_eq!(info.type_string(), "MonoBehaviour");

        info.class_id = 1001;
        assert_eq!(info.class(), None);
        assert_eq!(info.type_string(), "UnknownType(1001)");
    }

    #[test]
    fn test_class_names_round_trip() {
        for id in 0..300 {
            if let Some(class) = ClassId::from_i32(id) {
                assert_eq!(class as i32, id, "{}", class.name());
            }
        }
    }
}
