pub(super) const ROOT_LONG_ABOUT: &str = "\
Back up, prune and archive trees of project directories

Treetidy is meant for handing over or shelving a directory full of projects.
Take a backup copy, strip the backup of everything that can be regenerated,
and compress what is left into a single zip file.

TYPICAL WORKFLOW:

  1. Make a backup copy next to the original:
     $ treetidy copy ~/work/clients
     (creates ~/work/clients_bak)

  2. Remove dependencies, git metadata and ignored build output from every
     project in the backup:
     $ treetidy clean ~/work/clients_bak

  3. Compress the backup:
     $ treetidy archive ~/work/clients_bak
     (creates ~/work/clients.zip)

  Before step 1 it can help to bring a working copy up to date:
     $ treetidy sync ~/work/clients/site

GLOBAL OPTIONS:

  -C <DIRECTORY>
    Change to directory before operating (like git -C or make -C).
    Relative PATH arguments are resolved against it.

  -v, --verbose / --log-level <LEVEL>
    Control log output on stderr. Both take precedence over RUST_LOG.
    Without either, RUST_LOG is used, defaulting to warnings only.
";

pub(super) const COPY_LONG_ABOUT: &str = "\
Copy PATH recursively into a new sibling directory named PATH_bak.

Every directory and file is recreated with identical contents. Symlinks are
followed. The command refuses to run if PATH_bak already exists, and nothing
is touched in that case. If copying fails halfway, whatever was copied so far
is left in place.";

pub(super) const CLEAN_LONG_ABOUT: &str = "\
Search PATH for projects and remove what can be regenerated from them.

A project is a directory containing package.json, found at most --max-depth
levels below PATH (default 3). PATH itself is never treated as a project, and
the search does not continue into a project once found.

In each project the following are removed:
  - node_modules and .git
  - every path listed in the project's .gitignore

.gitignore lines are taken literally as paths relative to the project: blank
lines and lines starting with # are skipped, but wildcards and negations are
not interpreted. Listed paths that do not exist are skipped.

The first failed removal stops the command. Use --dry-run to list what would
be removed.";

pub(super) const ARCHIVE_LONG_ABOUT: &str = "\
Compress PATH into a zip file placed next to it.

The archive is named after PATH with its _bak suffix removed, so
/a/b/project_bak becomes /a/b/project.zip. An existing file of that name is
overwritten. Entries inside the archive start with the directory's own name
(project_bak/...), and file contents are deflated.

If archiving fails, the incomplete zip file is left on disk.";

pub(super) const SYNC_LONG_ABOUT: &str = "\
Switch the git working copy at PATH to its 'main' branch, or 'master' if there
is no 'main', then run git pull.

Requires git on PATH. Fails if neither branch exists, or if the checkout or
the pull fails; the error says which step failed.";
