//! Scaffold a new blog.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use quill_static::TemplateSet;

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing quill...");

    scaffold(Path::new("."), config_path, yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'quill dev' to start the development server.");

    Ok(())
}

/// Write the starter files under `root`. Existing files are kept unless `overwrite`.
fn scaffold(root: &Path, config_path: &Path, overwrite: bool) -> Result<()> {
    write_file(&root.join(config_path), DEFAULT_CONFIG, overwrite)?;
    write_file(
        &root.join("posts/notes/hello-world.md"),
        DEFAULT_POST,
        overwrite,
    )?;
    write_file(&root.join("style.css"), DEFAULT_STYLESHEET, overwrite)?;

    let templates_dir = root.join("templates");
    for (name, source) in TemplateSet::SOURCES {
        write_file(&templates_dir.join(name), source, overwrite)?;
    }

    Ok(())
}

fn write_file(path: &Path, contents: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Quill Configuration

[site]
# Site title, shown in every page header
title = "My Blog"

# One subdirectory per category
content_dir = "posts"

# Output directory for built site
output_dir = "dist"

# Fixed category list (defaults to every subdirectory of content_dir)
# categories = ["notes"]

[templates]
dir = "templates"

# Warn about {{placeholders}} a template uses but nothing fills in
strict = false

[assets]
stylesheet = "style.css"

# Host marker file copied to the output root
# marker = "CNAME"

minify = false

[markdown]
# Tables, strikethrough, task lists and footnotes
gfm = true
line_breaks = false

[links]
# "percent" or "raw"
encoding = "percent"

[build]
parallel = false
"#;

const DEFAULT_POST: &str = r#"# Hello World

This is your first post. Every markdown or HTML file inside a category
directory becomes a page; its first `# heading` becomes the title.

## Next steps

- Add more files under `posts/notes/`
- Create a new directory under `posts/` for another category
- Run `quill build` to publish into `dist/`
"#;

const DEFAULT_STYLESHEET: &str = r#"body {
  margin: 0;
  font-family: system-ui, sans-serif;
  line-height: 1.6;
  color: #222;
}

.site-nav {
  display: flex;
  gap: 1rem;
  padding: 1rem 2rem;
  border-bottom: 1px solid #ddd;
}

.site-nav a {
  color: inherit;
  text-decoration: none;
}

.blog-container {
  max-width: 48rem;
  margin: 0 auto;
  padding: 2rem;
}

.post-list li.empty,
.category-list li.empty {
  color: #888;
  list-style: none;
}

pre {
  overflow-x: auto;
  padding: 1rem;
  background: #f6f6f6;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_static::{BuildConfig, BuildMode, SiteBuilder};
    use tempfile::tempdir;

    #[test]
    fn scaffolds_a_buildable_site() {
        let temp = tempdir().unwrap();
        let root = temp.path();

        scaffold(root, Path::new("quill.toml"), false).unwrap();

        assert!(root.join("quill.toml").exists());
        assert!(root.join("style.css").exists());
        for (name, source) in TemplateSet::SOURCES {
            assert_eq!(fs::read_to_string(root.join("templates").join(name)).unwrap(), source);
        }

        let config: crate::config::ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.site.title, "My Blog");

        let build = BuildConfig {
            content_dir: root.join("posts"),
            output_dir: root.join("dist"),
            templates_dir: Some(root.join("templates")),
            stylesheet: Some(root.join("style.css")),
            ..Default::default()
        };
        let report = SiteBuilder::from_config(build).build(BuildMode::Incremental).unwrap();

        assert!(report.is_success());
        assert!(root.join("dist/notes/hello-world.html").exists());
    }

    #[test]
    fn keeps_existing_files_unless_overwrite() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::write(root.join("style.css"), "custom").unwrap();

        scaffold(root, Path::new("quill.toml"), false).unwrap();
        assert_eq!(fs::read_to_string(root.join("style.css")).unwrap(), "custom");

        scaffold(root, Path::new("quill.toml"), true).unwrap();
        assert_eq!(
            fs::read_to_string(root.join("style.css")).unwrap(),
            DEFAULT_STYLESHEET
        );
    }
}
