use crate::model::ScreenEntry;
use crate::naming::{capitalize, clean_feature_name, feature_import_path};

pub fn feature_screen(entry: &ScreenEntry, import_prefix: &str, regenerated: bool) -> String {
    let clean = clean_feature_name(&entry.name);
    let title = entry.title.as_deref().unwrap_or(clean);
    let origin = if regenerated {
        "updated/regenerated"
    } else {
        "auto-generated"
    };

    format!(
        r#"// {module}.tsx
'use client';
import {{ View, Text }} from 'react-native';
import {{ useColorScheme }} from 'react-native';

export function {component}() {{
  const colorScheme = useColorScheme();
  const color = colorScheme === 'dark' ? 'white' : 'black';
  return (
    <View style={{{{ flex: 1, alignItems: 'center', justifyContent: 'center', padding: 20, backgroundColor: colorScheme === 'dark' ? '#121212' : '#FFFFFF' }}}}>
      <Text style={{{{ fontSize: 24, marginBottom: 10, color }}}}>
        {title}
      </Text>
      <Text style={{{{ fontSize: 12, color }}}}>
        This screen was {origin} by navsync.
      </Text>
    </View>
  );
}}
"#,
        module = feature_import_path(import_prefix, clean),
        component = entry.component,
    )
}

pub fn native_route(entry: &ScreenEntry, import_prefix: &str) -> String {
    let clean = clean_feature_name(&entry.name);
    format!(
        r#"import {{ {component} }} from '{module}';

export default function {base}Route() {{
  return <{component} />;
}}
"#,
        component = entry.component,
        module = feature_import_path(import_prefix, clean),
        base = pascal_base(clean),
    )
}

pub fn web_page(entry: &ScreenEntry, import_prefix: &str) -> String {
    let clean = clean_feature_name(&entry.name);
    format!(
        r#"'use client';
import {{ {component} }} from '{module}';

export default function {base}Page() {{
  return <{component} />;
}}
"#,
        component = entry.component,
        module = feature_import_path(import_prefix, clean),
        base = pascal_base(clean),
    )
}

fn pascal_base(clean: &str) -> String {
    clean
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect()
}
