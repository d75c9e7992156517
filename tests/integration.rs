use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use navsync::config::{Config, Conventions, DEFAULT_LAYOUT};
use navsync::decide::{Answer, Policy};
use navsync::git::NoVcs;
use navsync::layout::{self, LayoutDocument};
use navsync::model::{DeclaredScreen, NavigatorKind, ParentRef, ScreenEntry, ScreenKey, Snapshot};
use navsync::sync::Engine;

const LAYOUT: &str = include_str!("fixtures/navigation/layout.tsx");

const SCREENS: [(&str, &str); 3] = [
    ("home", "(drawer)/(tabs)/(home)"),
    ("profile", "(drawer)/(tabs)/profile"),
    ("options", "(drawer)/options"),
];

fn conventions() -> Conventions {
    Conventions::default()
}

fn parse(source: &str) -> LayoutDocument {
    layout::parse(source, &conventions()).expect("fixture should parse")
}

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    /// The fixture layout with every declared screen's files in place.
    fn new() -> Self {
        let project = Self::with_layout(LAYOUT);
        for (feature, route) in SCREENS {
            project.write(
                &format!("packages/core/features/{feature}/screen.tsx"),
                "export function Placeholder() {}\n",
            );
            project.write(&format!("apps/expo/app/{route}/index.tsx"), "export default null;\n");
            project.write(&format!("apps/web/app/{route}/page.tsx"), "export default null;\n");
        }
        project
    }

    fn with_layout(source: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix("navsync")
            .tempdir()
            .expect("Failed to create temp dir");
        let project = Self { dir };
        project.write(DEFAULT_LAYOUT, source);
        project
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn layout(&self) -> String {
        std::fs::read_to_string(self.path(DEFAULT_LAYOUT)).unwrap()
    }

    fn config(&self) -> Config {
        Config::with_root(self.root())
    }

    fn engine(&self, decider: Policy) -> Engine {
        Engine::new(self.config(), Arc::new(decider), Arc::new(NoVcs))
    }
}

fn run_navsync(project: &Project, args: &[&str]) -> (bool, String, String) {
    let navsync = env!("CARGO_BIN_EXE_navsync");
    let output = Command::new(navsync)
        .arg("--root")
        .arg(project.root())
        .args(args)
        .env("NAVSYNC_LOG", "warn")
        .output()
        .expect("Failed to run navsync");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.success(), stdout, stderr)
}

fn declared(parent: &str, name: &str, component: &str) -> DeclaredScreen {
    DeclaredScreen {
        parent: ParentRef {
            name: parent.to_string(),
            kind: NavigatorKind::Tabs,
            route_path: vec![parent.to_string()],
        },
        entry: ScreenEntry::new(name, component),
    }
}

fn snapshot(screens: Vec<DeclaredScreen>) -> Snapshot {
    Snapshot { screens }
}

mod naming {
    use navsync::naming::*;

    use super::*;

    #[test]
    fn strips_index_and_grouping() {
        assert_eq!(route_segment("(home)/index"), "(home)");
        assert_eq!(route_segment("settings"), "settings");
        assert_eq!(clean_feature_name("(home)/index"), "home");
        assert_eq!(clean_feature_name("profile/index"), "profile");
    }

    #[test]
    fn derives_defaults_from_clean_name() {
        assert_eq!(component_for("settings"), "SettingsScreen");
        assert_eq!(display_title("settings"), "Settings");
        assert_eq!(screen_name_for("settings"), "settings/index");
        assert_eq!(
            feature_import_path("#features", "settings"),
            "#features/settings/screen"
        );
    }

    #[test]
    fn default_href_nests_under_parent() {
        let drawer = ParentRef {
            name: "(drawer)".to_string(),
            kind: NavigatorKind::Drawer,
            route_path: vec!["(drawer)".to_string()],
        };
        let root = ParentRef {
            name: "Root".to_string(),
            kind: NavigatorKind::Stack,
            route_path: Vec::new(),
        };
        assert_eq!(default_href("settings", &drawer, "Root"), "/drawer/settings");
        assert_eq!(default_href("settings", &root, "Root"), "/settings");
    }

    #[test]
    fn recognizes_feature_imports() {
        assert_eq!(
            feature_from_import("#features", "#features/home/screen"),
            Some("home")
        );
        assert_eq!(feature_from_import("#features", "react-native"), None);
        assert_eq!(feature_from_import("#features", "#features/home/other"), None);
    }

    #[test]
    fn sanitizes_cli_names() {
        assert_eq!(sanitize_cli_name("My-Settings!"), "mysettings");
        assert_eq!(sanitize_cli_name("  user_prefs "), "user_prefs");
        assert_eq!(sanitize_cli_name("???"), "");
    }
}

mod config {
    use super::*;

    #[tokio::test]
    async fn defaults_without_config_file() {
        let project = Project::with_layout(LAYOUT);
        let config = Config::load(project.root()).await.unwrap();

        assert_eq!(config.root, project.root());
        assert_eq!(config.layout_path(), project.path(DEFAULT_LAYOUT));
        assert_eq!(config.debounce_ms, 1000);
        assert_eq!(config.server.port, 4817);
        assert!(config.commit.enabled);
    }

    #[tokio::test]
    async fn reads_kebab_case_keys() {
        let project = Project::with_layout(LAYOUT);
        project.write(
            "navsync.toml",
            "native-app = \"mobile/app\"\ndebounce-ms = 250\n\n[commit]\nenabled = false\n\n[server]\nport = 9000\n",
        );
        let config = Config::load(project.root()).await.unwrap();

        assert_eq!(config.native_dir(), project.path("mobile/app"));
        assert_eq!(config.debounce_ms, 250);
        assert!(!config.commit.enabled);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.web_app, PathBuf::from("apps/web/app"));
    }

    #[tokio::test]
    async fn rejects_malformed_config() {
        let project = Project::with_layout(LAYOUT);
        project.write("navsync.toml", "debounce-ms = \"soon\"\n");
        assert!(Config::load(project.root()).await.is_err());
    }
}

mod parser {
    use navsync::error::ParseFailure;

    use super::*;

    #[test]
    fn string_escapes_are_decoded() {
        let source = LAYOUT.replace("title: 'Home'", r"title: 'Home\'s \u00e9 \u{1F600}'");
        let snapshot = parse(&source).snapshot();
        let home = snapshot
            .find(&ScreenKey::new("(tabs)", "(home)/index"))
            .unwrap();
        assert_eq!(home.entry.title.as_deref(), Some("Home's \u{e9} \u{1F600}"));
    }

    #[test]
    fn collects_screens_depth_first() {
        let document = parse(LAYOUT);
        let snapshot = document.snapshot();
        let keys: Vec<(String, String)> = snapshot
            .screens
            .iter()
            .map(|s| (s.parent.name.clone(), s.entry.name.clone()))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("(tabs)".to_string(), "(home)/index".to_string()),
                ("(tabs)".to_string(), "profile/index".to_string()),
                ("(drawer)".to_string(), "options/index".to_string()),
            ]
        );
    }

    #[test]
    fn records_route_paths_and_kinds() {
        let document = parse(LAYOUT);
        let snapshot = document.snapshot();
        let home = &snapshot.screens[0];
        let options = &snapshot.screens[2];

        assert_eq!(home.parent.kind, NavigatorKind::Tabs);
        assert_eq!(home.parent.route_path, vec!["(drawer)", "(tabs)"]);
        assert_eq!(options.parent.kind, NavigatorKind::Drawer);
        assert_eq!(options.parent.route_path, vec!["(drawer)"]);
        assert_eq!(document.root.name, "Root");
        assert_eq!(document.navigators().len(), 3);
    }

    #[test]
    fn reads_screen_attributes() {
        let snapshot = parse(LAYOUT).snapshot();
        let home = &snapshot.screens[0].entry;
        let options = &snapshot.screens[2].entry;

        assert_eq!(home.component, "HomeScreen");
        assert_eq!(home.href.as_deref(), Some("/tabs/home"));
        assert_eq!(home.title.as_deref(), Some("Home"));
        assert_eq!(home.icon.as_deref(), Some("home"));
        assert_eq!(home.visibility, None);
        assert_eq!(options.label.as_deref(), Some("Options"));
    }

    #[test]
    fn reads_imports_flags_and_style() {
        let document = parse(LAYOUT);

        assert_eq!(document.imports.len(), 5);
        assert_eq!(document.imports[2].module, "#features/home/screen");
        assert_eq!(document.imports[2].names[0].local, "HomeScreen");
        assert!(!document.flags.autosave);
        assert!(!document.flags.editing);
        assert!(!document.has_pending_commands());
        assert!(document.commands_value.is_some());
        assert_eq!(document.style.quote, '\'');
        assert_eq!(document.style.indent_unit, "  ");
        assert!(document.style.semicolons);
    }

    #[test]
    fn reads_flags_when_set() {
        let source = LAYOUT
            .replace("isAutoSaveEnabled = false", "isAutoSaveEnabled = true")
            .replace("isEditing = false", "isEditing = true");
        let document = parse(&source);
        assert!(document.flags.autosave);
        assert!(document.flags.editing);
    }

    #[test]
    fn reads_pending_commands_and_drops_malformed_ones() {
        let source = LAYOUT.replace(
            "commandsToExecute = { add: [], delete: [] }",
            "commandsToExecute = {\n  add: ['settings', { name: 'about', componentName: 'AboutScreen', parent: '(drawer)' }, { title: 'nameless' }, 42],\n  delete: ['profile'],\n}",
        );
        let document = parse(&source);

        assert!(document.has_pending_commands());
        assert_eq!(document.commands.add.len(), 2);
        assert_eq!(document.commands.add[0].name, "settings");
        assert_eq!(document.commands.add[1].component.as_deref(), Some("AboutScreen"));
        assert_eq!(document.commands.add[1].parent.as_deref(), Some("(drawer)"));
        assert_eq!(document.commands.delete.len(), 1);
    }

    #[test]
    fn syntax_error_is_distinct_from_empty_layout() {
        let broken = "export const appNavigationStructure = [\n  {\n    type: 'stack',\n";
        match layout::parse(broken, &conventions()) {
            Err(ParseFailure::Syntax { line, .. }) => assert!(line >= 1),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn missing_root_is_reported() {
        let result = layout::parse("export const somethingElse = [];\n", &conventions());
        match result {
            Err(failure @ ParseFailure::RootMissing(_)) => assert!(failure.is_transient()),
            other => panic!("expected a missing root, got {other:?}"),
        }
    }

    #[test]
    fn non_array_root_is_malformed() {
        let result = layout::parse("export const appNavigationStructure = 3;\n", &conventions());
        assert!(matches!(result, Err(ParseFailure::RootMalformed { .. })));
    }

    #[test]
    fn skips_screens_with_computed_components() {
        let source = LAYOUT.replace("component: ProfileScreen,", "component: lazy(() => ProfileScreen),");
        let snapshot = parse(&source).snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.screens.iter().all(|s| s.entry.name != "profile/index"));
    }
}

mod diffing {
    use navsync::diff::diff;

    use super::*;

    #[test]
    fn identical_snapshots_have_no_changes() {
        let current = parse(LAYOUT).snapshot();
        let changes = diff(&current, &current.clone());
        assert!(changes.is_empty());
        assert_eq!(changes.summary(), "no changes");
    }

    #[test]
    fn same_component_under_new_name_is_a_rename() {
        let previous = snapshot(vec![declared("(tabs)", "foo/index", "FooScreen")]);
        let current = snapshot(vec![declared("(tabs)", "bar/index", "FooScreen")]);
        let changes = diff(&current, &previous);

        assert_eq!(changes.renamed.len(), 1);
        assert!(changes.added.is_empty());
        assert!(changes.removed.is_empty());
        assert_eq!(changes.renamed[0].old.entry.name, "foo/index");
        assert_eq!(changes.renamed[0].new.entry.name, "bar/index");
    }

    #[test]
    fn classifies_every_identity_once() {
        let mut titled = declared("(tabs)", "home/index", "HomeScreen");
        titled.entry.title = Some("Start".to_string());
        let previous = snapshot(vec![
            declared("(tabs)", "home/index", "HomeScreen"),
            declared("(tabs)", "gone/index", "GoneScreen"),
            declared("(tabs)", "same/index", "SameScreen"),
        ]);
        let current = snapshot(vec![
            titled,
            declared("(tabs)", "same/index", "SameScreen"),
            declared("(tabs)", "new/index", "NewScreen"),
        ]);
        let changes = diff(&current, &previous);

        assert_eq!(changes.updated.len(), 1);
        assert_eq!(changes.updated[0].new.entry.title.as_deref(), Some("Start"));
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].entry.name, "gone/index");
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].entry.name, "new/index");
        assert!(changes.renamed.is_empty());
        assert_eq!(changes.len(), 3);
        assert_eq!(changes.summary(), "1 added, 1 removed, 1 updated");
    }

    #[test]
    fn same_name_under_another_parent_is_a_different_screen() {
        let previous = snapshot(vec![declared("(tabs)", "feed/index", "FeedScreen")]);
        let current = snapshot(vec![declared("(drawer)", "feed/index", "FeedScreen")]);
        let changes = diff(&current, &previous);

        assert_eq!(changes.renamed.len(), 1);
        assert_eq!(changes.renamed[0].new.parent.name, "(drawer)");
    }

    #[test]
    fn ambiguous_rename_pairs_first_candidate() {
        let previous = snapshot(vec![declared("(tabs)", "a/index", "SharedScreen")]);
        let current = snapshot(vec![
            declared("(tabs)", "b/index", "SharedScreen"),
            declared("(tabs)", "c/index", "SharedScreen"),
        ]);
        let changes = diff(&current, &previous);

        assert_eq!(changes.renamed.len(), 1);
        assert_eq!(changes.renamed[0].new.entry.name, "b/index");
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.added[0].entry.name, "c/index");
    }

    #[test]
    fn duplicate_keys_keep_first_occurrence() {
        let mut second = declared("(tabs)", "home/index", "OtherScreen");
        second.entry.title = Some("Dup".to_string());
        let current = snapshot(vec![declared("(tabs)", "home/index", "HomeScreen"), second]);
        let previous = snapshot(vec![declared("(tabs)", "home/index", "HomeScreen")]);

        assert!(diff(&current, &previous).is_empty());
    }

    #[test]
    fn diff_against_itself_after_applying_is_empty() {
        let previous = snapshot(vec![declared("(tabs)", "a/index", "AScreen")]);
        let current = snapshot(vec![
            declared("(tabs)", "a/index", "AScreen"),
            declared("(tabs)", "b/index", "BScreen"),
        ]);
        assert_eq!(diff(&current, &previous).added.len(), 1);
        assert!(diff(&current, &current).is_empty());
    }
}

mod rewriting {
    use navsync::error::RewriteError;
    use navsync::rewrite::{
        EditBatch, OptionPatch, Printer, Scalar, ScreenInsert, Splice, SplicePrinter, rewrite,
    };

    use super::*;

    fn insert(parent: &str, name: &str, component: &str) -> ScreenInsert {
        ScreenInsert {
            parent: parent.to_string(),
            entry: ScreenEntry::new(name, component),
        }
    }

    #[test]
    fn empty_batch_is_byte_identical() {
        let text = rewrite(LAYOUT, &EditBatch::default(), &conventions()).unwrap();
        assert_eq!(text, LAYOUT);
    }

    #[test]
    fn inserted_titles_survive_a_reparse() {
        let title = "It's \"new\"\nline\tend";
        let mut screen = insert("(drawer)", "notes/index", "NotesScreen");
        screen.entry.title = Some(title.to_string());
        let mut batch = EditBatch::default();
        batch.screens_to_add.push(screen);
        batch.add_import("NotesScreen", "notes");

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        let snapshot = parse(&text).snapshot();
        let notes = snapshot
            .find(&ScreenKey::new("(drawer)", "notes/index"))
            .unwrap();
        assert_eq!(notes.entry.title.as_deref(), Some(title));
    }

    #[test]
    fn refuses_output_that_no_longer_parses() {
        let mut batch = EditBatch::default();
        batch.screens_to_add.push(insert("(drawer)", "broken/index", "Broken Screen"));

        let result = rewrite(LAYOUT, &batch, &conventions());
        assert!(matches!(result, Err(RewriteError::Unparsable(_))));
    }

    #[test]
    fn type_only_imports_are_left_alone() {
        let source = LAYOUT.replace(
            "import { HomeScreen } from '#features/home/screen';",
            "import { HomeScreen } from '#features/home/screen';\nimport type { HomeProps } from '#features/home/screen';",
        );
        let mut batch = EditBatch::default();
        batch.remove_import("HomeProps", Some("home".to_string()));

        let text = rewrite(&source, &batch, &conventions()).unwrap();
        assert_eq!(text, source);
    }

    #[test]
    fn type_only_import_does_not_satisfy_a_value_import() {
        let source = LAYOUT.replace(
            "import { OptionsScreen } from '#features/options/screen';",
            "import type { OptionsScreen } from '#features/options/screen';",
        );
        let mut batch = EditBatch::default();
        batch.add_import("OptionsScreen", "options");

        let text = rewrite(&source, &batch, &conventions()).unwrap();
        assert!(text.contains("import type { OptionsScreen } from '#features/options/screen';"));
        assert!(text.contains("import { OptionsScreen } from '#features/options/screen';"));
    }

    #[test]
    fn inserts_screen_with_defaults_and_import() {
        let mut batch = EditBatch::default();
        batch.screens_to_add.push(insert("(drawer)", "settings/index", "SettingsScreen"));
        batch.add_import("SettingsScreen", "settings");

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        assert_eq!(
            text.matches("import { SettingsScreen } from '#features/settings/screen';")
                .count(),
            1
        );

        let document = parse(&text);
        let snapshot = document.snapshot();
        let settings = snapshot
            .find(&ScreenKey::new("(drawer)", "settings/index"))
            .expect("settings inserted");
        assert_eq!(settings.entry.component, "SettingsScreen");
        assert_eq!(settings.entry.title.as_deref(), Some("Settings"));
        assert_eq!(settings.entry.label.as_deref(), Some("Settings"));
        assert_eq!(settings.entry.href.as_deref(), Some("/drawer/settings"));
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn inserts_tab_screen_with_icon() {
        let mut batch = EditBatch::default();
        batch.screens_to_add.push(insert("(tabs)", "feed/index", "FeedScreen"));

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        let snapshot = parse(&text).snapshot();
        let feed = snapshot
            .find(&ScreenKey::new("(tabs)", "feed/index"))
            .expect("feed inserted");
        assert_eq!(feed.entry.icon.as_deref(), Some("feed"));
        assert_eq!(feed.entry.href.as_deref(), Some("/tabs/feed"));
    }

    #[test]
    fn inserting_existing_name_is_skipped() {
        let mut batch = EditBatch::default();
        batch.screens_to_add.push(insert("(tabs)", "profile/index", "ProfileScreen"));
        batch.add_import("ProfileScreen", "profile");

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        assert_eq!(text, LAYOUT);
    }

    #[test]
    fn insert_then_delete_round_trips() {
        let mut add = EditBatch::default();
        add.screens_to_add.push(insert("(drawer)", "settings/index", "SettingsScreen"));
        add.add_import("SettingsScreen", "settings");
        let added = rewrite(LAYOUT, &add, &conventions()).unwrap();
        assert_ne!(added, LAYOUT);

        let mut remove = EditBatch::default();
        remove
            .screens_to_delete
            .push(ScreenKey::new("(drawer)", "settings/index"));
        remove.remove_import("SettingsScreen", Some("settings".to_string()));
        let removed = rewrite(&added, &remove, &conventions()).unwrap();

        assert_eq!(removed, LAYOUT);
    }

    #[test]
    fn deletes_screen_and_its_import_line() {
        let mut batch = EditBatch::default();
        batch
            .screens_to_delete
            .push(ScreenKey::new("(tabs)", "profile/index"));
        batch.remove_import("ProfileScreen", Some("profile".to_string()));

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        assert!(!text.contains("ProfileScreen"));
        assert!(!text.contains("#features/profile/screen"));
        assert!(text.contains("import { OptionsScreen } from '#features/options/screen';\n"));
        assert_eq!(parse(&text).snapshot().len(), 2);
    }

    #[test]
    fn removing_one_of_several_names_keeps_the_statement() {
        let source = LAYOUT.replace(
            "import { HomeScreen } from '#features/home/screen';",
            "import { HomeScreen, HomeHeader } from '#features/home/screen';",
        );
        let mut batch = EditBatch::default();
        batch.remove_import("HomeScreen", Some("home".to_string()));

        let text = rewrite(&source, &batch, &conventions()).unwrap();
        assert!(text.contains("import { HomeHeader } from '#features/home/screen';"));
        assert!(!text.contains("import { HomeScreen"));
        assert!(text.contains("component: HomeScreen,"));
    }

    #[test]
    fn never_removes_non_feature_imports() {
        let mut batch = EditBatch::default();
        batch.remove_import("Text", None);
        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        assert_eq!(text, LAYOUT);
    }

    #[test]
    fn import_additions_are_deduplicated() {
        let mut batch = EditBatch::default();
        batch.add_import("HomeScreen", "home");
        batch.add_import("AboutScreen", "about");
        batch.add_import("AboutScreen", "about");

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        assert_eq!(text.matches("import { HomeScreen }").count(), 1);
        assert_eq!(
            text.matches("import { AboutScreen } from '#features/about/screen';")
                .count(),
            1
        );
    }

    #[test]
    fn removal_recreated_by_addition_is_cancelled() {
        let mut batch = EditBatch::default();
        batch.remove_import("HomeScreen", Some("home".to_string()));
        batch.add_import("HomeScreen", "home");

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        assert_eq!(text, LAYOUT);
    }

    #[test]
    fn patches_existing_option() {
        let batch = EditBatch {
            option_patches: vec![OptionPatch {
                navigator: "(tabs)".to_string(),
                path: vec![
                    "tabNavigatorOptions".to_string(),
                    "initialRouteName".to_string(),
                ],
                value: Scalar::Str("profile/index".to_string()),
            }],
            ..EditBatch::default()
        };

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        assert!(text.contains("initialRouteName: 'profile/index'"));
        assert!(!text.contains("initialRouteName: '(home)/index'"));
    }

    #[test]
    fn creates_missing_intermediate_objects() {
        let batch = EditBatch {
            option_patches: vec![OptionPatch {
                navigator: "(drawer)".to_string(),
                path: vec![
                    "drawerNavigatorOptions".to_string(),
                    "screenOptions".to_string(),
                    "headerShown".to_string(),
                ],
                value: Scalar::Bool(true),
            }],
            ..EditBatch::default()
        };

        let text = rewrite(LAYOUT, &batch, &conventions()).unwrap();
        assert!(text.contains("screenOptions: {"));
        assert!(text.contains("headerShown: true,"));
        assert_eq!(parse(&text).snapshot().len(), 3);
    }

    #[test]
    fn option_path_through_scalar_conflicts() {
        let batch = EditBatch {
            option_patches: vec![OptionPatch {
                navigator: "(drawer)".to_string(),
                path: vec![
                    "drawerNavigatorOptions".to_string(),
                    "initialRouteName".to_string(),
                    "deeper".to_string(),
                ],
                value: Scalar::Int(1),
            }],
            ..EditBatch::default()
        };

        let result = rewrite(LAYOUT, &batch, &conventions());
        assert!(matches!(result, Err(RewriteError::OptionConflict { .. })));
    }

    #[test]
    fn missing_navigator_aborts() {
        let mut batch = EditBatch::default();
        batch.screens_to_add.push(insert("(nowhere)", "x/index", "XScreen"));

        let result = rewrite(LAYOUT, &batch, &conventions());
        assert!(matches!(result, Err(RewriteError::NavigatorMissing(name)) if name == "(nowhere)"));
    }

    #[test]
    fn broken_source_aborts() {
        let mut batch = EditBatch::default();
        batch.add_import("XScreen", "x");
        let result = rewrite("export const appNavigationStructure = [", &batch, &conventions());
        assert!(matches!(result, Err(RewriteError::Parse(_))));
    }

    #[test]
    fn clears_command_queue() {
        let source = LAYOUT.replace(
            "commandsToExecute = { add: [], delete: [] }",
            "commandsToExecute = { add: ['settings'], delete: [] }",
        );
        let batch = EditBatch {
            clear_commands: true,
            ..EditBatch::default()
        };

        let text = rewrite(&source, &batch, &conventions()).unwrap();
        assert!(text.contains("commandsToExecute = { add: [], delete: [] };"));
        assert!(!parse(&text).has_pending_commands());
    }

    #[test]
    fn overlapping_splices_are_rejected() {
        let splices = vec![Splice::replace(1, 4, "x"), Splice::replace(2, 5, "y")];
        let result = SplicePrinter.print("abcdef", splices);
        assert!(matches!(result, Err(RewriteError::Overlap { .. })));
    }

    #[test]
    fn printer_keeps_untouched_bytes() {
        let splices = vec![Splice::insert(3, "-"), Splice::remove(0, 1)];
        assert_eq!(SplicePrinter.print("abcdef", splices).unwrap(), "bc-def");
    }
}

mod auditing {
    use navsync::audit::{AuditMode, Fix};
    use navsync::project::ArtifactKind;

    use super::*;

    #[tokio::test]
    async fn consistent_project_is_clean() {
        let project = Project::new();
        let mut engine = project.engine(Policy::accept_defaults());
        let report = engine.audit(AuditMode::Report).await.unwrap();
        assert!(report.is_clean(), "unexpected fixes: {:?}", report.fixes);
    }

    #[tokio::test]
    async fn type_only_imports_are_not_orphans() {
        let project = Project::new();
        let layout = project.layout().replace(
            "import { HomeScreen } from '#features/home/screen';",
            "import { HomeScreen } from '#features/home/screen';\nimport type { HomeProps } from '#features/home/screen';",
        );
        project.write(DEFAULT_LAYOUT, &layout);

        let mut engine = project.engine(Policy::accept_defaults());
        let report = engine.audit(AuditMode::Report).await.unwrap();
        assert!(report.is_clean(), "unexpected fixes: {:?}", report.fixes);
    }

    #[tokio::test]
    async fn reports_orphan_feature_without_touching_it() {
        let project = Project::new();
        project.write("packages/core/features/legacy/screen.tsx", "export {};\n");
        let mut engine = project.engine(Policy::accept_defaults());

        let report = engine.audit(AuditMode::Report).await.unwrap();
        assert_eq!(report.fixes.len(), 1);
        assert!(matches!(
            &report.fixes[0],
            Fix::Delete { artifact: ArtifactKind::Feature, path } if path.ends_with("legacy")
        ));
        assert_eq!(report.fixes_applied, 0);
        assert!(project.exists("packages/core/features/legacy/screen.tsx"));
    }

    #[tokio::test]
    async fn reports_missing_artifacts_and_imports() {
        let project = Project::new();
        std::fs::remove_dir_all(project.path("apps/web/app/(drawer)/options")).unwrap();
        let layout = project
            .layout()
            .replace("import { OptionsScreen } from '#features/options/screen';\n", "");
        project.write(DEFAULT_LAYOUT, &layout);

        let mut engine = project.engine(Policy::accept_defaults());
        let report = engine.audit(AuditMode::Report).await.unwrap();
        let labels: Vec<&str> = report.fixes.iter().map(Fix::label).collect();

        assert_eq!(labels, vec!["generate_web", "add_import"]);
    }

    #[tokio::test]
    async fn ignores_private_and_hidden_route_dirs() {
        let project = Project::new();
        project.write("apps/expo/app/_sitemap/index.tsx", "export default null;\n");
        project.write("apps/expo/app/.cache/index.tsx", "export default null;\n");

        let mut engine = project.engine(Policy::accept_defaults());
        let report = engine.audit(AuditMode::Report).await.unwrap();
        assert!(report.is_clean(), "unexpected fixes: {:?}", report.fixes);
    }

    #[tokio::test]
    async fn apply_all_fixes_files_and_imports_in_one_rewrite() {
        let project = Project::new();
        project.write("packages/core/features/legacy/screen.tsx", "export {};\n");
        std::fs::remove_dir_all(project.path("apps/expo/app/(drawer)/(tabs)/profile")).unwrap();
        let layout = project.layout().replace(
            "import { OptionsScreen } from '#features/options/screen';",
            "import { OptionsScreen } from '#features/options/screen';\nimport { OldScreen } from '#features/old/screen';",
        );
        project.write(DEFAULT_LAYOUT, &layout);

        let mut engine = project.engine(Policy::accept_defaults());
        let report = engine.audit(AuditMode::ApplyAll).await.unwrap();

        assert_eq!(report.fixes.len(), 3);
        assert_eq!(report.fixes_applied, 3);
        assert!(report.ast_modified);
        assert!(!project.exists("packages/core/features/legacy"));
        assert!(project.exists("apps/expo/app/(drawer)/(tabs)/profile/index.tsx"));
        assert!(!project.layout().contains("OldScreen"));

        let again = engine.audit(AuditMode::Report).await.unwrap();
        assert!(again.is_clean(), "unexpected fixes: {:?}", again.fixes);
    }

    #[tokio::test]
    async fn interactive_mode_applies_only_selected_fixes() {
        let project = Project::new();
        project.write("packages/core/features/legacy/screen.tsx", "export {};\n");
        project.write("packages/core/features/stale/screen.tsx", "export {};\n");

        let mut engine = project
            .engine(Policy::scripted([Answer::Select(vec![1])]))
            .with_audit_mode(AuditMode::Interactive);
        let report = engine.audit(AuditMode::Interactive).await.unwrap();

        assert_eq!(report.fixes.len(), 2);
        assert_eq!(report.fixes_applied, 1);
        assert!(project.exists("packages/core/features/legacy/screen.tsx"));
        assert!(!project.exists("packages/core/features/stale"));
    }
}

mod scenarios {
    use navsync::journal::{self, UnitKind, UnitStatus};
    use navsync::rewrite::{EditBatch, rewrite};
    use navsync::sync::{InitialRoute, NavigatorScreens, Phase, ScreenOp, ScreenSpec, ScreensRequest, SyncService};

    use super::*;

    const SETTINGS_FILES: [&str; 3] = [
        "packages/core/features/settings/screen.tsx",
        "apps/expo/app/(drawer)/settings/index.tsx",
        "apps/web/app/(drawer)/settings/page.tsx",
    ];

    async fn started(project: &Project, decider: Policy) -> Engine {
        let mut engine = project.engine(decider);
        engine.start().await.unwrap();
        engine
    }

    fn without_profile(source: &str) -> String {
        let mut batch = EditBatch::default();
        batch
            .screens_to_delete
            .push(ScreenKey::new("(tabs)", "profile/index"));
        rewrite(source, &batch, &conventions()).unwrap()
    }

    #[tokio::test]
    async fn add_generates_files_node_and_import() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        engine
            .run_command(ScreenOp::Add, &["settings".to_string()], None, false)
            .await
            .unwrap();

        for file in SETTINGS_FILES {
            assert!(project.exists(file), "missing {file}");
        }
        let feature =
            std::fs::read_to_string(project.path(SETTINGS_FILES[0])).unwrap();
        assert!(feature.contains("export function SettingsScreen()"));

        let layout = project.layout();
        assert_eq!(
            layout
                .matches("import { SettingsScreen } from '#features/settings/screen';")
                .count(),
            1
        );
        let snapshot = parse(&layout).snapshot();
        assert!(snapshot.find(&ScreenKey::new("(drawer)", "settings/index")).is_some());
        assert_eq!(engine.session().phase(), Phase::Idle);
        assert_eq!(engine.session().acknowledged().map(Snapshot::len), Some(4));
    }

    #[tokio::test]
    async fn delete_removes_files_node_and_import() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;
        engine
            .run_command(ScreenOp::Add, &["settings".to_string()], None, false)
            .await
            .unwrap();

        engine
            .run_command(ScreenOp::Delete, &["settings".to_string()], None, false)
            .await
            .unwrap();

        for file in SETTINGS_FILES {
            assert!(!project.exists(file), "leftover {file}");
        }
        assert!(!project.exists("packages/core/features/settings"));
        assert_eq!(project.layout(), LAYOUT);
    }

    #[tokio::test]
    async fn declined_delete_changes_nothing() {
        let project = Project::new();
        let mut engine = started(&project, Policy::scripted([Answer::Confirm(false)])).await;

        engine
            .run_command(ScreenOp::Delete, &["profile".to_string()], None, false)
            .await
            .unwrap();

        assert_eq!(project.layout(), LAYOUT);
        assert!(project.exists("packages/core/features/profile/screen.tsx"));
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        engine
            .run_command(ScreenOp::Add, &["settings".to_string()], Some("(drawer)"), true)
            .await
            .unwrap();

        assert_eq!(project.layout(), LAYOUT);
        assert!(!project.exists(SETTINGS_FILES[0]));
    }

    #[tokio::test]
    async fn unknown_parent_is_an_error() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        let result = engine
            .run_command(ScreenOp::Add, &["settings".to_string()], Some("(nowhere)"), false)
            .await;
        assert!(result.is_err());
        assert_eq!(engine.session().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn own_write_is_suppressed_once() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;
        engine
            .run_command(ScreenOp::Add, &["settings".to_string()], None, false)
            .await
            .unwrap();
        assert!(engine.session().is_suppressing());

        // A manual edit landing before the watcher fires is absorbed by the
        // suppression and only acknowledged.
        project.write(DEFAULT_LAYOUT, &without_profile(&project.layout()));
        engine.handle_change().await.unwrap();

        assert!(!engine.session().is_suppressing());
        assert!(project.exists("packages/core/features/profile/screen.tsx"));
        assert_eq!(engine.session().acknowledged().map(Snapshot::len), Some(3));
    }

    #[tokio::test]
    async fn manual_removal_deletes_files_and_import() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        project.write(DEFAULT_LAYOUT, &without_profile(LAYOUT));
        engine.handle_change().await.unwrap();

        assert!(!project.exists("packages/core/features/profile"));
        assert!(!project.exists("apps/expo/app/(drawer)/(tabs)/profile"));
        assert!(!project.exists("apps/web/app/(drawer)/(tabs)/profile"));
        assert!(!project.layout().contains("ProfileScreen"));
        assert_eq!(engine.session().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn rename_moves_files_and_swaps_import() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        let renamed = LAYOUT.replace("name: 'profile/index'", "name: 'account/index'");
        project.write(DEFAULT_LAYOUT, &renamed);
        engine.handle_change().await.unwrap();

        assert!(project.exists("packages/core/features/account/screen.tsx"));
        assert!(project.exists("apps/expo/app/(drawer)/(tabs)/account/index.tsx"));
        assert!(project.exists("apps/web/app/(drawer)/(tabs)/account/page.tsx"));
        assert!(!project.exists("packages/core/features/profile"));

        let layout = project.layout();
        assert!(layout.contains("import { ProfileScreen } from '#features/account/screen';"));
        assert!(!layout.contains("#features/profile/screen"));
    }

    #[tokio::test]
    async fn declined_batch_leaves_files_alone() {
        let project = Project::new();
        let mut engine = started(&project, Policy::scripted([Answer::Confirm(false)])).await;

        project.write(DEFAULT_LAYOUT, &without_profile(LAYOUT));
        engine.handle_change().await.unwrap();

        assert!(project.exists("packages/core/features/profile/screen.tsx"));
        assert_eq!(engine.session().acknowledged().map(Snapshot::len), Some(2));
    }

    #[tokio::test]
    async fn editing_mode_defers_processing() {
        let editing = LAYOUT
            .replace("isAutoSaveEnabled = false", "isAutoSaveEnabled = true")
            .replace("isEditing = false", "isEditing = true");
        let project = Project::new();
        project.write(DEFAULT_LAYOUT, &editing);
        let mut engine = started(&project, Policy::accept_defaults()).await;

        project.write(DEFAULT_LAYOUT, &without_profile(&editing));
        engine.handle_change().await.unwrap();
        assert_eq!(engine.session().phase(), Phase::EditingMode);
        assert!(project.exists("packages/core/features/profile/screen.tsx"));

        let done = without_profile(&editing).replace("isEditing = true", "isEditing = false");
        project.write(DEFAULT_LAYOUT, &done);
        engine.handle_change().await.unwrap();
        assert_eq!(engine.session().phase(), Phase::Idle);
        assert!(!project.exists("packages/core/features/profile"));
    }

    #[tokio::test]
    async fn pending_commands_run_and_clear() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        let queued = LAYOUT.replace(
            "commandsToExecute = { add: [], delete: [] }",
            "commandsToExecute = { add: [{ name: 'settings', parent: '(drawer)' }], delete: ['options'] }",
        );
        project.write(DEFAULT_LAYOUT, &queued);
        engine.handle_change().await.unwrap();

        let layout = project.layout();
        assert!(layout.contains("commandsToExecute = { add: [], delete: [] };"));
        assert!(layout.contains("import { SettingsScreen } from '#features/settings/screen';"));
        assert!(!layout.contains("OptionsScreen"));
        for file in SETTINGS_FILES {
            assert!(project.exists(file), "missing {file}");
        }
        assert!(!project.exists("packages/core/features/options"));
    }

    #[tokio::test]
    async fn parse_failure_keeps_acknowledged_snapshot() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        project.write(DEFAULT_LAYOUT, "export const appNavigationStructure = [\n  {\n");
        engine.handle_change().await.unwrap();

        assert_eq!(engine.session().acknowledged().map(Snapshot::len), Some(3));
        assert_eq!(engine.session().phase(), Phase::Idle);
        assert!(project.exists("packages/core/features/profile/screen.tsx"));
    }

    #[tokio::test]
    async fn initial_route_is_patched() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        engine
            .set_initial_route("(tabs)", "profile", false)
            .await
            .unwrap();

        assert!(project.layout().contains("initialRouteName: 'profile/index'"));
        assert!(engine.set_initial_route("(tabs)", "missing", false).await.is_err());
    }

    #[tokio::test]
    async fn http_request_adds_screens_non_interactively() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;
        let request = ScreensRequest {
            navigators: vec![NavigatorScreens {
                navigator: "(tabs)".to_string(),
                screens: vec![ScreenSpec {
                    name: "feed".to_string(),
                    title: Some("News Feed".to_string()),
                    ..ScreenSpec::default()
                }],
            }],
            initial_route: Some(InitialRoute {
                navigator: "(tabs)".to_string(),
                route: "feed".to_string(),
            }),
        };

        let output = engine.apply_request(&request).await.unwrap();

        assert!(output.iter().any(|line| line.contains("feed/index")));
        assert!(project.exists("apps/expo/app/(drawer)/(tabs)/feed/index.tsx"));
        assert!(project.exists("packages/core/features/feed/screen.tsx"));
        let layout = project.layout();
        assert!(layout.contains("title: 'News Feed'"));
        assert!(layout.contains("tabBarIconName: 'feed'"));
        assert!(layout.contains("initialRouteName: 'feed/index'"));
    }

    #[tokio::test]
    async fn request_body_uses_camel_case() {
        let body = r#"{
            "navigators": [{ "navigator": "(drawer)", "screens": [{ "name": "about", "componentName": "AboutScreen", "showOn": ["web"] }] }],
            "initialRoute": { "navigator": "(drawer)", "route": "about" }
        }"#;
        let request: ScreensRequest = serde_json::from_str(body).unwrap();

        let spec = &request.navigators[0].screens[0];
        assert_eq!(spec.component.as_deref(), Some("AboutScreen"));
        assert_eq!(spec.show_on, Some(vec!["web".to_string()]));
        assert_eq!(request.initial_route.unwrap().route, "about");
    }

    #[tokio::test]
    async fn units_of_work_are_journalled() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;
        engine
            .run_command(ScreenOp::Add, &["settings".to_string()], None, false)
            .await
            .unwrap();

        let state = project.path(".navsync");
        assert!(state.join(".gitignore").exists());
        let units = journal::read_units(&state).await.unwrap();
        let add = units
            .iter()
            .find(|u| u.kind == UnitKind::Add)
            .expect("add unit recorded");
        assert_eq!(add.status, UnitStatus::Completed);
        assert_eq!(add.paths.len(), 3);
        assert!(units.iter().any(|u| u.kind == UnitKind::Rewrite));
        assert!(units.iter().all(|u| !u.is_interrupted()));
    }

    #[tokio::test]
    async fn name_without_a_valid_component_is_skipped() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;

        engine
            .run_command(ScreenOp::Add, &["2fa".to_string()], Some("(drawer)"), false)
            .await
            .unwrap();

        assert_eq!(project.layout(), LAYOUT);
        assert!(!project.exists("packages/core/features/2fa"));
        assert_eq!(engine.session().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn prompted_component_rescues_an_invalid_default() {
        let project = Project::new();
        let decider = Policy::scripted([
            Answer::Input("TwoFactorScreen".to_string()),
            Answer::Input("Two factor".to_string()),
        ]);
        let mut engine = started(&project, decider).await;

        engine
            .run_command(ScreenOp::Add, &["2fa".to_string()], Some("(drawer)"), false)
            .await
            .unwrap();

        let layout = project.layout();
        assert!(layout.contains("component: TwoFactorScreen"));
        assert!(layout.contains("import { TwoFactorScreen } from '#features/2fa/screen';"));
        assert!(project.exists("packages/core/features/2fa/screen.tsx"));
    }

    #[tokio::test]
    async fn request_reports_names_without_a_valid_component() {
        let project = Project::new();
        let mut engine = started(&project, Policy::accept_defaults()).await;
        let request = ScreensRequest {
            navigators: vec![NavigatorScreens {
                navigator: "(drawer)".to_string(),
                screens: vec![ScreenSpec {
                    name: "2fa".to_string(),
                    ..ScreenSpec::default()
                }],
            }],
            initial_route: None,
        };

        let output = engine.apply_request(&request).await.unwrap();
        assert!(output.iter().any(|line| line.starts_with("Skipped '2fa'")), "{output:?}");
        assert_eq!(project.layout(), LAYOUT);
    }

    #[tokio::test]
    async fn separate_journals_never_share_unit_ids() {
        let project = Project::new();
        let state = project.path(".navsync");
        let first = journal::Journal::new(&state);
        let second = journal::Journal::new(&state);

        let alpha = first.begin(UnitKind::Add, Some("alpha"), None).await;
        let beta = second.begin(UnitKind::Delete, Some("beta"), None).await;
        assert_ne!(alpha.id, beta.id);
        first.complete(&alpha, &[], None).await;
        second.complete(&beta, &[], None).await;

        let units = journal::read_units(&state).await.unwrap();
        assert_eq!(units.len(), 2);
        assert!(units.iter().all(|u| u.status == UnitStatus::Completed));
        assert_eq!(units[0].kind, UnitKind::Add);
        assert_eq!(units[1].kind, UnitKind::Delete);
    }

    #[tokio::test]
    async fn change_during_busy_engine_is_not_lost() {
        let project = Project::new();
        let engine = started(&project, Policy::accept_defaults()).await;
        let service = Arc::new(SyncService::new(engine));

        let guard = service.engine().await;
        project.write(DEFAULT_LAYOUT, &without_profile(LAYOUT));
        let first = tokio::spawn({
            let service = service.clone();
            async move { service.notify_change().await }
        });
        let second = tokio::spawn({
            let service = service.clone();
            async move { service.notify_change().await }
        });
        while !service.has_pending() {
            tokio::task::yield_now().await;
        }
        drop(guard);
        first.await.unwrap();
        second.await.unwrap();

        assert!(!service.has_pending());
        assert!(!project.exists("packages/core/features/profile"));
        assert_eq!(service.engine().await.session().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn notifications_after_a_pass_run_again() {
        let project = Project::new();
        let engine = started(&project, Policy::accept_defaults()).await;
        let service = SyncService::new(engine);

        service.notify_change().await;
        project.write(DEFAULT_LAYOUT, &without_profile(LAYOUT));
        service.notify_change().await;

        assert!(!service.has_pending());
        assert!(!project.exists("packages/core/features/profile"));
    }
}

mod cli {
    use super::*;

    #[test]
    fn unknown_subcommand_exits_non_zero() {
        let project = Project::new();
        let (success, _, stderr) = run_navsync(&project, &["frobnicate"]);
        assert!(!success);
        assert!(stderr.contains("Usage"), "stderr: {stderr}");
    }

    #[test]
    fn audit_reports_consistent_project() {
        let project = Project::new();
        let (success, stdout, stderr) = run_navsync(&project, &["audit"]);
        assert!(success, "stderr: {stderr}");
        assert!(stdout.contains("consistent"), "stdout: {stdout}");
    }

    #[test]
    fn audit_lists_orphans_without_fixing() {
        let project = Project::new();
        project.write("packages/core/features/legacy/screen.tsx", "export {};\n");
        let (success, stdout, _) = run_navsync(&project, &["audit"]);
        assert!(success);
        assert!(stdout.contains("delete_feature"), "stdout: {stdout}");
        assert!(project.exists("packages/core/features/legacy/screen.tsx"));
    }

    #[test]
    fn dry_run_add_prints_diff() {
        let project = Project::new();
        let (success, stdout, stderr) =
            run_navsync(&project, &["--yes", "add", "settings", "--dry-run"]);
        assert!(success, "stderr: {stderr}");
        assert!(stdout.contains("+import { SettingsScreen }"), "stdout: {stdout}");
        assert_eq!(project.layout(), LAYOUT);
    }

    #[test]
    fn empty_journal() {
        let project = Project::new();
        let (success, stdout, _) = run_navsync(&project, &["journal"]);
        assert!(success);
        assert!(stdout.contains("Journal is empty."));
    }
}
