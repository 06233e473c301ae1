// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Test Harness
 * Pulls the engine test suites into one integration target
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

mod engine;
