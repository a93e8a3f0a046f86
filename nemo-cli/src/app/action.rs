/// User actions that can be performed in the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move selection up
    MoveUp,
    /// Move selection down
    MoveDown,
    /// Move selection up by a page
    PageUp,
    /// Move selection down by a page
    PageDown,
    /// Go to first row
    GoToFirst,
    /// Go to last row
    GoToLast,
    /// Expand selected directory
    Expand,
    /// Collapse selected directory (or jump to its parent)
    Collapse,
    /// Toggle expand/collapse
    Toggle,
    /// Show help overlay
    ShowHelp,
    /// Hide help overlay
    HideHelp,
    /// Ask to delete the selected row
    Delete,
    /// Remember the selected row as copy source
    Yank,
    /// Ask to copy the yanked file next to the selection
    Paste,
    /// Duplicate the selected row in place
    Duplicate,
    /// Run the pending delete or copy
    Confirm,
    /// Drop the pending delete or copy
    Dismiss,
    /// Cancel the newest running operation
    CancelOperation,
    /// Pause or resume the newest running operation
    TogglePause,
    /// Sort by the next attribute
    CycleSort,
    /// Flip ascending/descending
    ReverseSort,
    /// Toggle directories-first
    ToggleDirectoriesFirst,
    /// Show or hide dot files
    ToggleHidden,
    /// Re-read every shown directory
    Refresh,
    /// Quit the application
    Quit,
    /// No action (for tick events)
    Tick,
}
