//! Self-describing type layouts stored in the assets file metadata

use serde::Serialize;

use crate::{
    error::{Error, Result},
    io::Reader,
};

/// Deepest legacy tree accepted before the data is considered corrupt
const MAX_DEPTH: usize = 256;

/// Upper bound on node and child counts
const MAX_NODES: usize = 0x100000;

/// Strings shared by every flat-encoded tree, keyed by offset
const COMMON_STRINGS: &[(u32, &str)] = &[
    (0, "AABB"),
    (5, "AnimationClip"),
    (19, "AnimationCurve"),
    (34, "AnimationState"),
    (49, "Array"),
    (55, "Base"),
    (60, "BitField"),
    (69, "bitset"),
    (76, "bool"),
    (81, "char"),
    (86, "ColorRGBA"),
    (96, "Component"),
    (106, "data"),
    (111, "deque"),
    (117, "double"),
    (124, "dynamic_array"),
    (138, "FastPropertyName"),
    (155, "first"),
    (161, "float"),
    (167, "Font"),
    (172, "GameObject"),
    (183, "Generic Mono"),
    (196, "GradientNEW"),
    (208, "GUID"),
    (213, "GUIStyle"),
    (222, "int"),
    (226, "list"),
    (231, "long long"),
    (241, "map"),
    (245, "Matrix4x4f"),
    (256, "MdFour"),
    (263, "MonoBehaviour"),
    (277, "MonoScript"),
    (288, "m_ByteSize"),
    (299, "m_Curve"),
    (307, "m_EditorClassIdentifier"),
    (331, "m_EditorHideFlags"),
    (349, "m_Enabled"),
    (359, "m_ExtensionPtr"),
    (374, "m_GameObject"),
    (387, "m_Index"),
    (395, "m_IsArray"),
    (405, "m_IsStatic"),
    (416, "m_MetaFlag"),
    (427, "m_Name"),
    (434, "m_ObjectHideFlags"),
    (452, "m_PrefabInternal"),
    (469, "m_PrefabParentObject"),
    (490, "m_Script"),
    (499, "m_StaticEditorFlags"),
    (519, "m_Type"),
    (526, "m_Version"),
    (536, "Object"),
    (543, "pair"),
    (548, "PPtr<Component>"),
    (564, "PPtr<GameObject>"),
    (581, "PPtr<Material>"),
    (596, "PPtr<MonoBehaviour>"),
    (616, "PPtr<MonoScript>"),
    (633, "PPtr<Object>"),
    (646, "PPtr<Prefab>"),
    (659, "PPtr<Sprite>"),
    (672, "PPtr<TextAsset>"),
    (688, "PPtr<Texture>"),
    (702, "PPtr<Texture2D>"),
    (718, "PPtr<Transform>"),
    (734, "Prefab"),
    (741, "Quaternionf"),
    (753, "Rectf"),
    (759, "RectInt"),
    (767, "RectOffset"),
    (778, "second"),
    (785, "set"),
    (789, "short"),
    (795, "size"),
    (800, "SInt16"),
    (807, "SInt32"),
    (814, "SInt64"),
    (821, "SInt8"),
    (827, "staticvector"),
    (840, "string"),
    (847, "TextAsset"),
    (857, "TextMesh"),
    (866, "Texture"),
    (874, "Texture2D"),
    (884, "Transform"),
    (894, "TypelessData"),
    (907, "UInt16"),
    (914, "UInt32"),
    (921, "UInt64"),
    (928, "UInt8"),
    (934, "unsigned int"),
    (947, "unsigned long long"),
    (966, "unsigned short"),
    (981, "vector"),
    (988, "Vector2f"),
    (997, "Vector3f"),
    (1006, "Vector4f"),
    (1015, "m_ScriptingClassIdentifier"),
    (1042, "Gradient"),
    (1051, "Type*"),
];

pub fn common_string(offset: u32) -> Option<&'static str> {
    COMMON_STRINGS
        .binary_search_by_key(&offset, |(o, _)| *o)
        .ok()
        .map(|i| COMMON_STRINGS[i].1)
}

/// Formats that store trees as a flat node table plus string buffer
pub fn uses_flat_encoding(format: u32) -> bool {
    format == 10 || format >= 12
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeTree {
    pub type_name: String,
    pub name: String,
    pub version: i32,
    pub is_array: bool,
    pub size: i32,
    pub index: i32,
    pub flags: i32,
    pub children: Vec<TypeTree>,
}

impl TypeTree {
    pub fn read(format: u32, reader: &mut Reader) -> Result<Self> {
        if uses_flat_encoding(format) {
            read_flat(format, reader)
        } else {
            read_legacy(reader, 0)
        }
    }

    /// Total number of nodes including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TypeTree::node_count).sum::<usize>()
    }

    pub fn child(&self, name: &str) -> Option<&TypeTree> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn read_legacy(reader: &mut Reader, depth: usize) -> Result<TypeTree> {
    if depth > MAX_DEPTH {
        return Err(Error::invalid(
            reader.position(),
            "Type tree nested too deeply",
        ));
    }

    let type_name = reader.read_cstring()?;
    let name = reader.read_cstring()?;
    let size = reader.read_i32()?;
    let index = reader.read_i32()?;
    let is_array = reader.read_i32()? != 0;
    let version = reader.read_i32()?;
    let flags = reader.read_i32()?;

    let child_count = reader.read_length(MAX_NODES)?;
    let children = (0..child_count)
        .map(|_| read_legacy(reader, depth + 1))
        .collect::<Result<_>>()?;

    Ok(TypeTree {
        type_name,
        name,
        version,
        is_array,
        size,
        index,
        flags,
        children,
    })
}

/// Resolve a string reference: a nonzero tag means the shared table, otherwise the tree's own
/// string buffer. Unknown shared offsets fall back to the number itself.
fn resolve_string(offset: u16, tag: u16, strings: &Reader) -> Result<String> {
    if tag != 0 {
        return Ok(common_string(offset.into())
            .map(str::to_owned)
            .unwrap_or_else(|| offset.to_string()));
    }

    let mut strings = strings.clone();
    strings.seek(offset.into())?;
    strings.read_cstring()
}

fn read_flat(format: u32, reader: &mut Reader) -> Result<TypeTree> {
    let node_count = reader.read_length(MAX_NODES)?;
    let strings_len = reader.read_length(usize::MAX)?;
    let node_size = if format >= 19 { 32 } else { 24 };

    let node_bytes = reader.read_bytes(node_count * node_size)?;
    let strings = Reader::new(reader.read_bytes(strings_len)?, reader.endian);
    let mut nodes = Reader::new(node_bytes, reader.endian);

    // stack[d] is the open node at depth d
    let mut stack: Vec<TypeTree> = Vec::new();
    for _ in 0..node_count {
        let offset = nodes.position();
        let version = nodes.read_i16()?;
        let depth = nodes.read_u8()? as usize;
        let is_array = nodes.read_bool()?;
        let type_ref = (nodes.read_u16()?, nodes.read_u16()?);
        let name_ref = (nodes.read_u16()?, nodes.read_u16()?);
        let size = nodes.read_i32()?;
        let index = nodes.read_i32()?;
        let flags = nodes.read_i32()?;
        if format >= 19 {
            // Ref type hash
            nodes.skip(8)?;
        }

        let node = TypeTree {
            type_name: resolve_string(type_ref.0, type_ref.1, &strings)?,
            name: resolve_string(name_ref.0, name_ref.1, &strings)?,
            version: version.into(),
            is_array,
            size,
            index,
            flags,
            children: vec![],
        };

        if depth == 0 && !stack.is_empty() {
            return Err(Error::invalid(offset, "Type tree has more than one root"));
        }
        close_to_depth(&mut stack, depth);
        if stack.len() != depth {
            return Err(Error::invalid(
                offset,
                format!("Node depth {depth} skips a level, parent depth is {}", stack.len()),
            ));
        }
        stack.push(node);
    }

    close_to_depth(&mut stack, 1);
    Ok(stack.pop().unwrap_or_default())
}

/// Pop nodes deeper than `depth`, attaching each to its parent
fn close_to_depth(stack: &mut Vec<TypeTree>, depth: usize) {
    while stack.len() > depth.max(1) {
        if let Some(node) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            }
        }
    }
}
