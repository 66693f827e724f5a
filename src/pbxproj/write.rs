//! Serializer producing the layout Xcode itself writes
//!
//! Objects are grouped into `/* Begin <isa> section */` blocks, sorted by
//! isa and then by id. Every reference to another object is followed by a
//! `/* comment */` naming it, the way Xcode does.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use super::value::{Dict, Value};

/// Objects Xcode writes on a single line
const INLINE_ISAS: &[&str] = &["PBXBuildFile", "PBXFileReference"];

/// Keys whose object-id values Xcode leaves uncommented
const UNCOMMENTED_KEYS: &[&str] = &["remoteGlobalIDString", "TestTargetID"];

/// Serialize a whole document
///
/// `project_name` is used for the comment on the project's configuration
/// list, since the name is not stored in the file itself.
pub fn serialize(root: &Dict, project_name: &str) -> String {
    let comments = root
        .get_dict("objects")
        .map(|objects| reference_comments(objects, project_name))
        .unwrap_or_default();

    let mut writer = Writer {
        out: String::from("// !$*UTF8*$!\n{\n"),
        comments: &comments,
    };

    for (key, value) in root.iter() {
        match (key, value) {
            ("objects", Value::Dict(objects)) => writer.write_objects(objects),
            _ => {
                writer.indent(1);
                writer.write_entry(key, value, 1, false, false);
                writer.out.push('\n');
            }
        }
    }

    writer.out.push_str("}\n");
    writer.out
}

/// Whether Xcode writes `s` without quotes
pub fn is_bare(s: &str) -> bool {
    !s.is_empty()
        && !s.contains("//")
        && !s.contains("/*")
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '/'))
}

/// Quote a string unless it is made only of characters Xcode leaves bare
pub fn quote(s: &str) -> Cow<'_, str> {
    if is_bare(s) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(always_quote(s))
}

fn always_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            '\0' => quoted.push_str("\\0"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

struct Writer<'a> {
    out: String,
    comments: &'a HashMap<String, String>,
}

impl Writer<'_> {
    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push('\t');
        }
    }

    fn write_objects(&mut self, objects: &Dict) {
        let mut sections: BTreeMap<&str, Vec<(&str, &Value)>> = BTreeMap::new();
        for (id, object) in objects.iter() {
            let isa = object
                .as_dict()
                .and_then(|dict| dict.get_str("isa"))
                .unwrap_or_default();
            sections.entry(isa).or_default().push((id, object));
        }

        self.indent(1);
        self.out.push_str("objects = {\n");
        for (isa, mut entries) in sections {
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let inline = INLINE_ISAS.contains(&isa);

            let _ = writeln!(self.out, "\n/* Begin {} section */", isa);
            for (id, object) in entries {
                self.indent(2);
                self.write_entry(id, object, 2, inline, true);
                self.out.push('\n');
            }
            let _ = writeln!(self.out, "/* End {} section */", isa);
        }
        self.indent(1);
        self.out.push_str("};\n");
    }

    /// Write `key = value;` without a trailing newline
    ///
    /// Only keys of the `objects` table get a reference comment.
    fn write_entry(&mut self, key: &str, value: &Value, depth: usize, inline: bool, comment_key: bool) {
        self.write_string(key, comment_key);
        self.out.push_str(" = ");
        match value {
            Value::String(s) => self.write_string(s, !UNCOMMENTED_KEYS.contains(&key)),
            _ => self.write_value(value, depth, inline),
        }
        self.out.push(';');
    }

    fn write_string(&mut self, s: &str, with_comment: bool) {
        self.out.push_str(&quote(s));
        self.write_comment(s, with_comment);
    }

    fn write_comment(&mut self, s: &str, with_comment: bool) {
        if with_comment {
            if let Some(comment) = self.comments.get(s) {
                let _ = write!(self.out, " /* {} */", comment);
            }
        }
    }

    fn write_value(&mut self, value: &Value, depth: usize, inline: bool) {
        match value {
            Value::String(s) => self.write_string(s, true),
            Value::Quoted(s) => {
                self.out.push_str(&always_quote(s));
                self.write_comment(s, true);
            }
            Value::Data(bytes) => {
                self.out.push('<');
                for byte in bytes {
                    let _ = write!(self.out, "{:02x}", byte);
                }
                self.out.push('>');
            }
            Value::Array(items) if inline => {
                self.out.push('(');
                for item in items {
                    self.write_value(item, depth, true);
                    self.out.push_str(", ");
                }
                self.out.push(')');
            }
            Value::Array(items) => {
                self.out.push_str("(\n");
                for item in items {
                    self.indent(depth + 1);
                    self.write_value(item, depth + 1, false);
                    self.out.push_str(",\n");
                }
                self.indent(depth);
                self.out.push(')');
            }
            Value::Dict(dict) if inline => {
                self.out.push('{');
                for (key, value) in isa_first(dict) {
                    self.write_entry(key, value, depth, true, false);
                    self.out.push(' ');
                }
                self.out.push('}');
            }
            Value::Dict(dict) => {
                self.out.push_str("{\n");
                for (key, value) in isa_first(dict) {
                    self.indent(depth + 1);
                    self.write_entry(key, value, depth + 1, false, false);
                    self.out.push('\n');
                }
                self.indent(depth);
                self.out.push('}');
            }
        }
    }
}

fn isa_first(dict: &Dict) -> impl Iterator<Item = (&str, &Value)> {
    let isa = dict.get("isa").map(|value| ("isa", value));
    isa.into_iter().chain(dict.iter().filter(|(key, _)| *key != "isa"))
}

/// Default display name of a build phase without an explicit `name`
fn phase_name(isa: &str, phase: &Dict) -> String {
    if let Some(name) = phase.get_str("name") {
        return name.to_string();
    }
    let name = match isa {
        "PBXSourcesBuildPhase" => "Sources",
        "PBXResourcesBuildPhase" => "Resources",
        "PBXFrameworksBuildPhase" => "Frameworks",
        "PBXHeadersBuildPhase" => "Headers",
        "PBXCopyFilesBuildPhase" => "CopyFiles",
        "PBXShellScriptBuildPhase" => "ShellScript",
        other => other,
    };
    name.to_string()
}

/// Build the id -> comment table for every object in the project
fn reference_comments(objects: &Dict, project_name: &str) -> HashMap<String, String> {
    let mut phase_of_build_file: HashMap<&str, String> = HashMap::new();
    let mut list_owner: HashMap<&str, String> = HashMap::new();

    for (_, object) in objects.iter() {
        let Some(object) = object.as_dict() else {
            continue;
        };
        let isa = object.get_str("isa").unwrap_or_default();

        if isa.ends_with("BuildPhase") {
            let name = phase_name(isa, object);
            for file in object.get_array("files").into_iter().flatten() {
                if let Some(file) = file.as_str() {
                    phase_of_build_file.insert(file, name.clone());
                }
            }
        }

        if let Some(list) = object.get_str("buildConfigurationList") {
            let owner = if isa == "PBXProject" {
                project_name
            } else {
                object.get_str("name").unwrap_or_default()
            };
            list_owner.insert(
                list,
                format!("Build configuration list for {} \"{}\"", isa, owner),
            );
        }
    }

    let file_name = |id: &str| -> Option<String> {
        let file = objects.get_dict(id)?;
        file.get_str("name")
            .or_else(|| file.get_str("path"))
            .map(str::to_string)
    };

    let mut comments = HashMap::new();
    for (id, object) in objects.iter() {
        let Some(object) = object.as_dict() else {
            continue;
        };
        let isa = object.get_str("isa").unwrap_or_default();

        let comment = match isa {
            "PBXBuildFile" => {
                let file = object
                    .get_str("fileRef")
                    .and_then(file_name)
                    .unwrap_or_else(|| "(null)".to_string());
                match phase_of_build_file.get(id) {
                    Some(phase) => Some(format!("{} in {}", file, phase)),
                    None => Some(file),
                }
            }
            "PBXProject" => Some("Project object".to_string()),
            "XCConfigurationList" => list_owner.get(id).cloned(),
            _ if isa.ends_with("BuildPhase") => Some(phase_name(isa, object)),
            _ => object
                .get_str("name")
                .or_else(|| object.get_str("path"))
                .map(str::to_string)
                .or_else(|| (!isa.is_empty()).then(|| isa.to_string())),
        };

        if let Some(comment) = comment {
            comments.insert(id.to_string(), comment);
        }
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::super::parse::parse;
    use super::*;

    const SAMPLE: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	classes = {
	};
	objectVersion = 46;
	objects = {
		AAAAAAAAAAAAAAAAAAAAAAA2 = {isa = PBXFileReference; lastKnownFileType = sourcecode.c.objc; path = main.m; sourceTree = "<group>"; };
		AAAAAAAAAAAAAAAAAAAAAAA1 = {isa = PBXBuildFile; fileRef = AAAAAAAAAAAAAAAAAAAAAAA2; };
		AAAAAAAAAAAAAAAAAAAAAAA3 = {
			isa = PBXSourcesBuildPhase;
			buildActionMask = 2147483647;
			files = (
				AAAAAAAAAAAAAAAAAAAAAAA1,
			);
			runOnlyForDeploymentPostprocessing = 0;
		};
	};
	rootObject = AAAAAAAAAAAAAAAAAAAAAAA9;
}
"#;

    #[test]
    fn test_quote() {
        assert_eq!(quote("PBXGroup"), "PBXGroup");
        assert_eq!(quote("sourcecode.c.objc"), "sourcecode.c.objc");
        assert_eq!(quote("<group>"), "\"<group>\"");
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("HelloCordova/Classes"), "HelloCordova/Classes");
        assert_eq!(quote("a//b"), "\"a//b\"");
        assert_eq!(quote("a/*b"), "\"a/*b\"");
        assert_eq!(quote("a \"b\""), "\"a \\\"b\\\"\"");
    }

    #[test]
    fn test_sections_and_comments() {
        let root = parse(SAMPLE).unwrap();
        let out = serialize(&root, "HelloCordova");

        assert!(out.starts_with("// !$*UTF8*$!\n{\n"));
        assert!(out.contains(
            "/* Begin PBXBuildFile section */\n\t\tAAAAAAAAAAAAAAAAAAAAAAA1 /* main.m in Sources */ = {isa = PBXBuildFile; fileRef = AAAAAAAAAAAAAAAAAAAAAAA2 /* main.m */; };\n/* End PBXBuildFile section */"
        ));
        assert!(out.contains("sourceTree = \"<group>\"; };"));
        assert!(out.contains(
            "\t\t\tfiles = (\n\t\t\t\tAAAAAAAAAAAAAAAAAAAAAAA1 /* main.m in Sources */,\n\t\t\t);"
        ));

        // Sections come out in isa order regardless of input order
        let build_file = out.find("Begin PBXBuildFile").unwrap();
        let file_ref = out.find("Begin PBXFileReference").unwrap();
        let sources = out.find("Begin PBXSourcesBuildPhase").unwrap();
        assert!(build_file < file_ref && file_ref < sources);
    }

    #[test]
    fn test_output_parses_back_to_same_graph() {
        let root = parse(SAMPLE).unwrap();
        let out = serialize(&root, "HelloCordova");
        let reparsed = parse(&out).unwrap();

        let before = root.get_dict("objects").unwrap();
        let after = reparsed.get_dict("objects").unwrap();
        assert_eq!(after.len(), before.len());
        for (id, object) in before.iter() {
            assert_eq!(after.get(id), Some(object), "object {} changed", id);
        }
        assert_eq!(reparsed.get_str("rootObject"), root.get_str("rootObject"));
        // Serializing again is stable
        assert_eq!(serialize(&reparsed, "HelloCordova"), out);
    }

    #[test]
    fn test_configuration_list_comment() {
        let root = parse(
            r#"{ objects = {
                L1 = { isa = XCConfigurationList; buildConfigurations = ( ); };
                T1 = { isa = PBXNativeTarget; buildConfigurationList = L1; name = ShareExt; };
            }; }"#,
        )
        .unwrap();
        let out = serialize(&root, "HelloCordova");
        assert!(out.contains("L1 /* Build configuration list for PBXNativeTarget \"ShareExt\" */"));
    }

    #[test]
    fn test_only_object_keys_are_commented() {
        let root = parse(
            r#"{ objects = {
                P1 = { isa = PBXProject; attributes = { TargetAttributes = { T1 = { CreatedOnToolsVersion = 9.0; }; }; }; targets = ( T1 ); };
                T1 = { isa = PBXNativeTarget; name = ShareExt; };
            }; rootObject = P1; }"#,
        )
        .unwrap();
        let out = serialize(&root, "HelloCordova");

        assert_eq!(out.matches("T1 /* ShareExt */ = {").count(), 1);
        assert!(out.contains("\t\t\t\t\tT1 = {\n"));
        assert!(out.contains("\t\t\t\tT1 /* ShareExt */,\n"));
    }

    #[test]
    fn test_quoted_value_stays_quoted() {
        let root = parse(r#"{ a = "Share/Info.plist"; b = Share/Info.plist; c = "x-y"; }"#).unwrap();
        assert_eq!(root.get("a"), Some(&Value::Quoted("Share/Info.plist".to_string())));
        assert_eq!(root.get("c"), Some(&Value::from("x-y")));

        let out = serialize(&root, "HelloCordova");
        assert!(out.contains("\ta = \"Share/Info.plist\";\n"));
        assert!(out.contains("\tb = Share/Info.plist;\n"));
        assert!(out.contains("\tc = \"x-y\";\n"));
    }
}
